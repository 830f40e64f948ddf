use std::error::Error;
use std::path::{Path, PathBuf};

use client::Reply;

type CliResult = Result<(), Box<dyn Error>>;

pub async fn upload(uri: &str, files: &[PathBuf]) -> CliResult {
    let reply = client::upload_files(uri, files).await?;
    if reply.is_success() {
        println!("{} files uploaded. Status: {}", files.len(), reply.status);
        Ok(())
    } else {
        Err(failure("upload", &reply).into())
    }
}

pub async fn list(uri: &str) -> CliResult {
    let images = client::list_images(uri).await?;
    println!("{}", client::images_table(uri, &images));
    println!("{} images", images.len());
    Ok(())
}

pub async fn download(uri: &str, output: &Path) -> CliResult {
    let written = client::download_archive(uri, output).await?;
    println!("archive saved to {} ({written} bytes)", output.display());
    Ok(())
}

pub async fn delete(uri: &str) -> CliResult {
    let reply = client::delete_all(uri).await?;
    if reply.is_success() {
        println!("all images deleted");
        Ok(())
    } else {
        Err(failure("delete", &reply).into())
    }
}

pub async fn admin(uri: &str, key: &str) -> CliResult {
    let reply = client::check_admin(uri, key).await?;
    if reply.is_success() {
        let target = reply.redirect.as_deref().unwrap_or("/images");
        println!("secret accepted, images are at {target}");
        Ok(())
    } else {
        Err(failure("admin", &reply).into())
    }
}

fn failure(operation: &str, reply: &Reply) -> String {
    let detail = match (&reply.signal, reply.body.trim()) {
        (Some(signal), _) => signal.clone(),
        (None, "") => String::from("no details"),
        (None, body) => body.to_owned(),
    };
    format!("{operation} failed with {}: {detail}", reply.status)
}
