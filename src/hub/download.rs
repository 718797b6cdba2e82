use std::{
    fs::OpenOptions,
    io::{Read, Write},
    path::Path,
};

use reqwest::blocking::Client;

use super::progress::{ProgressReporter, Stage};
use crate::error::{HubError, IoContext, Result};

const CHUNK_SIZE: usize = 4 * 1024;

/// Streams `url` into a freshly created file at `path`.
///
/// Integrity is not checked here. When the server omits `Content-Length` the
/// body is written in one piece without progress updates.
pub fn download_to_file(
    client: &Client,
    url: &str,
    path: &Path,
    progress: &mut dyn ProgressReporter,
) -> Result<u64> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .io_context(|| format!("create staging file {}", path.display()))?;

    let mut response = client
        .get(url)
        .send()
        .map_err(|err| HubError::transport("request model archive", err))?
        .error_for_status()
        .map_err(|err| HubError::transport("download model archive", err))?;

    progress.begin(Stage::Downloading);

    let Some(total) = response.content_length() else {
        tracing::debug!("archive response has no content length");
        let body = response
            .bytes()
            .map_err(|err| HubError::transport("read model archive", err))?;
        file.write_all(&body).io_context(|| "write model archive")?;
        file.flush().io_context(|| "flush model archive")?;
        progress.finish(Stage::Downloading);
        return Ok(body.len() as u64);
    };

    let mut downloaded = 0u64;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = response
            .read(&mut buffer)
            .io_context(|| "read download chunk")?;
        if read == 0 {
            break;
        }
        file.write_all(&buffer[..read])
            .io_context(|| "write download chunk")?;
        downloaded += read as u64;
        progress.advance(Stage::Downloading, downloaded, Some(total));
    }
    file.flush().io_context(|| "flush model archive")?;
    progress.finish(Stage::Downloading);

    tracing::debug!(bytes = downloaded, expected = total, "archive downloaded");
    Ok(downloaded)
}
