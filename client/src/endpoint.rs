extern crate url;

use self::url::Url;
use core::fmt;

const SEP: char = '/';

/// Base address of a picdrop server that routes are resolved against.
#[derive(Clone)]
pub struct Endpoint {
    base: Url,
}

impl Endpoint {
    #[must_use]
    pub fn new(uri: &str) -> Option<Endpoint> {
        let mut base = Url::parse(uri).ok()?;
        if base.cannot_be_a_base() {
            return None;
        }
        if !base.path().ends_with(SEP) {
            let path = format!("{}{SEP}", base.path());
            base.set_path(&path);
        }
        base.set_query(None);
        base.set_fragment(None);
        Some(Endpoint { base })
    }

    /// Resolves `route` below the base path, leading slashes are ignored.
    #[must_use]
    pub fn route(&self, route: &str) -> Url {
        let relative = route.trim_start_matches(SEP);
        self.base.join(relative).unwrap_or_else(|_| self.base.clone())
    }

    /// Retrieval URL of a stored image.
    #[must_use]
    pub fn image(&self, name: &str) -> Url {
        let name = url_escape::encode_component(name);
        self.route(&format!("{}/{name}", kernel::IMAGE_PREFIX))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn new_correct_some() {
        // Arrange

        // Act
        let r = Endpoint::new("http://localhost:8080");

        // Assert
        assert!(r.is_some());
    }

    #[test_case("http/localhost" ; "no scheme")]
    #[test_case("mailto:someone@example.com" ; "cannot be a base")]
    fn new_incorrect_none(uri: &str) {
        // Act
        let r = Endpoint::new(uri);

        // Assert
        assert!(r.is_none());
    }

    #[test_case("http://localhost", "upload", "http://localhost/upload" ; "1")]
    #[test_case("http://localhost", "/upload", "http://localhost/upload" ; "2")]
    #[test_case("http://localhost/", "images", "http://localhost/images" ; "3")]
    #[test_case("http://localhost:8080", "/download", "http://localhost:8080/download" ; "4")]
    #[test_case("http://localhost/pics", "admin", "http://localhost/pics/admin" ; "5")]
    #[test_case("http://localhost/pics/", "/admin", "http://localhost/pics/admin" ; "6")]
    #[test_case("http://localhost/pics?x=1#top", "delete", "http://localhost/pics/delete" ; "7")]
    fn route_tests(base: &str, route: &str, expected: &str) {
        // Arrange
        let e = Endpoint::new(base).unwrap();

        // Act
        let url = e.route(route);

        // Assert
        assert_eq!(url.as_str(), expected);
    }

    #[test_case("photo(1).png", "http://localhost/imageGetter/photo(1).png" ; "parens kept")]
    #[test_case("my photo(2).jpg", "http://localhost/imageGetter/my%20photo(2).jpg" ; "space escaped")]
    fn image_tests(name: &str, expected: &str) {
        // Arrange
        let e = Endpoint::new("http://localhost").unwrap();

        // Act
        let url = e.image(name);

        // Assert
        assert_eq!(url.as_str(), expected);
    }
}
