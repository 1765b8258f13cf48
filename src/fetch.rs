use crate::asset::Asset;
use crate::error::{FetchError, SkipReason};
use crate::session::Session;
use futures_util::{Stream, TryStreamExt};
use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

const INCOMPLETE_SUFFIX: &str = ".incomplete";

/// Download the asset at `url` into `dir`, named after the file name found in
/// the URL. An existing file is returned as is, without any request.
pub async fn fetch_to_disk(
    session: &Session,
    asset: &Asset,
    url: &str,
    dir: &Path,
    skip: &HashSet<String>,
) -> Result<PathBuf, SkipReason> {
    let file_name = asset.file_name(url)?;
    if skip.contains(&file_name) {
        return Err(SkipReason::Excluded(file_name));
    }
    let target = dir.join(&file_name);
    if target.is_file() {
        debug!(path = %target.display(), "output file already exists");
        return Ok(target);
    }
    download(session, url, &target).await?;
    Ok(target)
}

/// Retrieve the full body of `url` into memory.
pub async fn fetch_to_memory(session: &Session, url: &str) -> Result<Vec<u8>, FetchError> {
    let bytes = session.get(url).await?.bytes().await?;
    Ok(bytes.to_vec())
}

async fn download(session: &Session, url: &str, target: &Path) -> Result<(), FetchError> {
    let response = session.get(url).await?;
    write_atomically(response.bytes_stream(), target).await?;

    let size = fs::metadata(target).await?.len();
    info!(path = %target.display(), size, "saved file");
    Ok(())
}

/// Write `body` to a temporary file next to `target` and only move it into
/// place once the whole stream has been written. Each call gets its own
/// `.incomplete` file, so two downloads of the same name never share one.
/// A failed stream removes its temporary file and never creates `target`.
async fn write_atomically<S, B, E>(body: S, target: &Path) -> Result<(), FetchError>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    FetchError: From<E>,
{
    let dir = target
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let prefix = format!("{}.", target.file_name().unwrap_or_default().to_string_lossy());
    let (file, incomplete) = tempfile::Builder::new()
        .prefix(&prefix)
        .suffix(INCOMPLETE_SUFFIX)
        .tempfile_in(dir)?
        .into_parts();
    let mut file = File::from_std(file);

    let mut body = std::pin::pin!(body);
    let copied: Result<(), FetchError> = async {
        while let Some(chunk) = body.try_next().await? {
            file.write_all(chunk.as_ref()).await?;
        }
        Ok(())
    }
    .await;
    // Flush on both paths so nothing is still in flight once we return, but
    // report the body error first.
    let flushed = file.flush().await;
    drop(file);
    copied?;
    flushed?;

    incomplete.persist(target).map_err(io::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{stream, StreamExt};
    use tokio::sync::oneshot;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FILE_PATH: &str = "/Nodes('T32UNG_20190101T103421_TCI.jp2')/$value";

    async fn mock_asset(server: &MockServer, expected_requests: u64) {
        Mock::given(method("GET"))
            .and(path(FILE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jp2 bytes".to_vec()))
            .expect(expected_requests)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_fetch_to_disk_is_idempotent() {
        let server = MockServer::start().await;
        mock_asset(&server, 1).await;
        let dir = tempfile::tempdir().unwrap();
        let session = Session::default();
        let asset = Asset::true_color();
        let url = format!("{}{}", server.uri(), FILE_PATH);

        let first = fetch_to_disk(&session, &asset, &url, dir.path(), &HashSet::new())
            .await
            .unwrap();
        let second = fetch_to_disk(&session, &asset, &url, dir.path(), &HashSet::new())
            .await
            .unwrap();

        assert_eq!(first, dir.path().join("T32UNG_20190101T103421_TCI.jp2"));
        assert_eq!(first, second);
        assert_eq!(std::fs::read(&first).unwrap(), b"jp2 bytes");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_to_disk_skip_list() {
        let server = MockServer::start().await;
        mock_asset(&server, 0).await;
        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}{}", server.uri(), FILE_PATH);
        let skip = HashSet::from(["T32UNG_20190101T103421_TCI.jp2".to_string()]);

        let result =
            fetch_to_disk(&Session::default(), &Asset::true_color(), &url, dir.path(), &skip).await;
        assert!(matches!(result, Err(SkipReason::Excluded(_))));
    }

    #[tokio::test]
    async fn test_fetch_to_disk_naming_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = fetch_to_disk(
            &Session::default(),
            &Asset::true_color(),
            "http://127.0.0.1:9/Nodes('B04.jp2')/$value",
            dir.path(),
            &HashSet::new(),
        )
        .await;
        assert!(matches!(result, Err(SkipReason::Naming(_))));
    }

    #[tokio::test]
    async fn test_fetch_to_disk_error_status_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().unwrap();
        let url = format!("{}{}", server.uri(), FILE_PATH);

        let result = fetch_to_disk(
            &Session::default(),
            &Asset::true_color(),
            &url,
            dir.path(),
            &HashSet::new(),
        )
        .await;
        assert!(matches!(result, Err(SkipReason::Fetch(FetchError::Request(_)))));
        assert!(!dir.path().join("T32UNG_20190101T103421_TCI.jp2").exists());
    }

    #[tokio::test]
    async fn test_interrupted_body_never_reaches_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("T32UNG_TCI.jp2");
        let body = stream::iter(vec![
            Ok(b"first chunk".to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
            Ok(b"never written".to_vec()),
        ]);

        let result = write_atomically(body, &target).await;

        assert!(matches!(result, Err(FetchError::Io(_))));
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_writes_to_same_target() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("T32UNG_TCI.jp2");

        // The first writer stops halfway until the second one has failed.
        let (halfway_tx, halfway_rx) = oneshot::channel();
        let (resume_tx, resume_rx) = oneshot::channel::<()>();
        let first_body = stream::iter(vec![Ok::<_, io::Error>(b"AAAA".to_vec())]).chain(
            stream::once(async move {
                halfway_tx.send(()).ok();
                resume_rx.await.ok();
                Ok(b"BBBB".to_vec())
            }),
        );
        let first = tokio::spawn({
            let target = target.clone();
            async move { write_atomically(first_body, &target).await }
        });
        halfway_rx.await.unwrap();

        let second_body = stream::iter(vec![
            Ok(b"CC".to_vec()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")),
        ]);
        assert!(write_atomically(second_body, &target).await.is_err());

        resume_tx.send(()).unwrap();
        first.await.unwrap().unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"AAAABBBB");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_fetch_to_memory() {
        let server = MockServer::start().await;
        mock_asset(&server, 2).await;
        let url = format!("{}{}", server.uri(), FILE_PATH);
        let session = Session::default();

        // No idempotency in memory mode: every call re-fetches.
        assert_eq!(fetch_to_memory(&session, &url).await.unwrap(), b"jp2 bytes");
        assert_eq!(fetch_to_memory(&session, &url).await.unwrap(), b"jp2 bytes");
    }
}
