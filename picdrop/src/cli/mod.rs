pub mod bugreport;
pub mod client;
pub mod server;
pub mod version;

pub const DEFAULT_URI: &str = "http://localhost:8080";
pub const ARCHIVE_NAME: &str = "images.zip";

pub const SERVER_SUBCOMMAND: &str = "server";
pub const SERVER_DESCRIPTION: &str = "Run the server";

pub const VERSION_SUBCOMMAND: &str = "version";
pub const VERSION_DESCRIPTION: &str = "Display the version and build information";

pub const BUGREPORT_SUBCOMMAND: &str = "bugreport";
pub const BUGREPORT_DESCRIPTION: &str = "Collect information about the system and the environment to include in bug reports";

pub const UPLOAD_SUBCOMMAND: &str = "upload";
pub const UPLOAD_DESCRIPTION: &str = "Upload images into the shared folder";

pub const LIST_SUBCOMMAND: &str = "list";
pub const LIST_DESCRIPTION: &str = "List uploaded images";

pub const DOWNLOAD_SUBCOMMAND: &str = "download";
pub const DOWNLOAD_DESCRIPTION: &str = "Download all uploaded images as one zip archive";

pub const DELETE_SUBCOMMAND: &str = "delete";
pub const DELETE_DESCRIPTION: &str = "Delete all uploaded images";

pub const ADMIN_SUBCOMMAND: &str = "admin";
pub const ADMIN_DESCRIPTION: &str = "Check the admin secret against the server";
