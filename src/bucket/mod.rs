//! Asynchronous client for the per-key DIAL file bucket.

use std::ops::Deref;
use std::path::Path;

use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{multipart, StatusCode, Url};
use serde::{de::DeserializeOwned, Deserialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{DialError, Result};
use crate::models::{Attachment, UploadInfo, REFERENCE_KEYS};

const FILES_API_VERSION: &str = "v1";
const API_KEY_HEADER: &str = "api-key";
/// Multipart field the files API reads the uploaded content from
const UPLOAD_FIELD: &str = "attachment";

/// Lifecycle state of a [`DialBucketClient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session is held; bucket operations fail with `NotAcquired`.
    Unacquired,
    /// A session is open and bucket operations may run.
    Acquired,
}

#[derive(Debug)]
struct Session {
    client: reqwest::Client,
    bucket: OnceCell<String>,
}

#[derive(Deserialize)]
struct BucketInfo {
    bucket: String,
}

/// Client for uploading and downloading files in the caller's bucket.
///
/// Construction binds no network resources. A session must be acquired,
/// either explicitly with [`acquire`](Self::acquire) or through
/// [`session`](Self::session) / [`scope`](Self::scope), before any
/// bucket operation runs.
///
/// # Example
///
/// ```no_run
/// use dial_ai_rust::bucket::DialBucketClient;
///
/// # async fn run() -> dial_ai_rust::error::Result<()> {
/// let mut client = DialBucketClient::new("api-key", "https://dial.example.com");
/// let session = client.session()?;
/// let upload = session.put_file("x.png", "image/png", &b"..."[..]).await?;
/// let bytes = session.get_file(upload.reference().unwrap_or_default()).await?;
/// # drop(bytes);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct DialBucketClient {
    api_key: String,
    base_url: String,
    session: Option<Session>,
}

impl DialBucketClient {
    /// Creates a new bucket client.
    ///
    /// # Arguments
    ///
    /// * `api_key` - The key that scopes the bucket
    /// * `base_url` - Root URL of the DIAL service
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: None,
        }
    }

    /// Returns the current lifecycle state.
    pub fn state(&self) -> SessionState {
        match self.session {
            Some(_) => SessionState::Acquired,
            None => SessionState::Unacquired,
        }
    }

    /// Opens the session: builds the connection pool and auth headers.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyAcquired` if a session is already open, and `Config`
    /// if the key or base URL cannot be used.
    pub fn acquire(&mut self) -> Result<()> {
        if self.session.is_some() {
            return Err(DialError::AlreadyAcquired);
        }
        if self.base_url.is_empty() {
            return Err(DialError::Config("base URL must not be empty".into()));
        }
        if self.api_key.is_empty() {
            return Err(DialError::Config("API key must not be empty".into()));
        }

        let mut api_key = HeaderValue::from_str(&self.api_key)
            .map_err(|_| DialError::Config("API key is not a valid header value".into()))?;
        api_key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        debug!(base_url = %self.base_url, "bucket session acquired");
        self.session = Some(Session {
            client,
            bucket: OnceCell::new(),
        });
        Ok(())
    }

    /// Closes the session. Releasing an unacquired client is a no-op.
    pub fn release(&mut self) {
        if self.session.take().is_some() {
            debug!(base_url = %self.base_url, "bucket session released");
        }
    }

    /// Acquires a session that is released when the returned guard drops.
    ///
    /// The guard releases on every exit path, including early returns,
    /// panics and cancellation of the enclosing task.
    pub fn session(&mut self) -> Result<BucketSession<'_>> {
        self.acquire()?;
        Ok(BucketSession { client: self })
    }

    /// Runs `f` inside a session and releases it afterwards, whatever `f`
    /// returns.
    ///
    /// ```no_run
    /// # use dial_ai_rust::bucket::DialBucketClient;
    /// # async fn run(mut client: DialBucketClient) -> dial_ai_rust::error::Result<()> {
    /// let upload = client
    ///     .scope(|bucket| {
    ///         Box::pin(async move { bucket.put_file("a.txt", "text/plain", &b"hi"[..]).await })
    ///     })
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scope<T, F>(&mut self, f: F) -> Result<T>
    where
        F: for<'a> FnOnce(&'a DialBucketClient) -> BoxFuture<'a, Result<T>>,
    {
        let session = self.session()?;
        f(&*session).await
    }

    fn active(&self) -> Result<&Session> {
        self.session.as_ref().ok_or(DialError::NotAcquired)
    }

    async fn bucket(&self, session: &Session) -> Result<String> {
        let bucket = session
            .bucket
            .get_or_try_init(|| async {
                let url = format!("{}/{}/bucket", self.base_url, FILES_API_VERSION);
                debug!(%url, "discovering bucket");
                let response = session.client.get(&url).send().await?;

                let status = response.status();
                if !status.is_success() {
                    let message = response.text().await.unwrap_or_default();
                    warn!(%status, "bucket discovery failed");
                    return Err(DialError::Upload {
                        status: status.as_u16(),
                        message,
                    });
                }
                let info: BucketInfo = decode_upload_body(status, response).await?;
                Ok::<_, DialError>(info.bucket)
            })
            .await?;
        Ok(bucket.clone())
    }

    /// Uploads `content` to the bucket under `name`.
    ///
    /// The store assigns the authoritative reference; resolve it with
    /// [`UploadInfo::reference`]. Repeated uploads with the same arguments
    /// may create distinct objects.
    ///
    /// `content` is read to the end before the request starts, so a failed
    /// read never leaves a partial object in the store. `name` is sent as a
    /// single percent-encoded path segment.
    ///
    /// # Errors
    ///
    /// * `NotAcquired` outside a session
    /// * `InvalidRequest` for an empty name or malformed MIME type
    /// * `IoRead` if `content` cannot be fully read
    /// * `Upload` on any non-success response from the store
    pub async fn put_file<R>(
        &self,
        name: &str,
        mime_type: &str,
        mut content: R,
    ) -> Result<UploadInfo>
    where
        R: AsyncRead + Unpin,
    {
        let session = self.active()?;
        if name.trim().is_empty() || name == "." || name == ".." {
            return Err(DialError::invalid(format!("invalid file name {name:?}")));
        }
        mime_type
            .parse::<mime_guess::Mime>()
            .map_err(|e| DialError::invalid(format!("invalid MIME type {mime_type:?}: {e}")))?;

        let mut data = Vec::new();
        content
            .read_to_end(&mut data)
            .await
            .map_err(DialError::IoRead)?;

        let bucket = self.bucket(session).await?;
        let url = self.files_url(&bucket, name)?;
        debug!(%url, size = data.len(), mime_type, "uploading file");

        let part = multipart::Part::bytes(data)
            .file_name(name.to_string())
            .mime_str(mime_type)?;
        let form = multipart::Form::new().part(UPLOAD_FIELD, part);

        let response = session.client.put(url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(%status, name, "upload rejected");
            return Err(DialError::Upload {
                status: status.as_u16(),
                message,
            });
        }

        let upload: UploadInfo = decode_upload_body(status, response).await?;
        if upload.reference().is_none() {
            return Err(DialError::Upload {
                status: status.as_u16(),
                message: format!(
                    "upload response carries none of {}",
                    REFERENCE_KEYS.join(", ")
                ),
            });
        }
        Ok(upload)
    }

    /// Builds `{base}/v1/files/{bucket}/{name}` with `name` encoded as a
    /// single path segment.
    fn files_url(&self, bucket: &str, name: &str) -> Result<Url> {
        let invalid_base = |reason: String| {
            DialError::Config(format!("invalid base URL {:?}: {reason}", self.base_url))
        };
        let mut url = Url::parse(&self.base_url).map_err(|e| invalid_base(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid_base("cannot hold a path".to_string()))?
            .pop_if_empty()
            .extend([FILES_API_VERSION, "files", bucket, name]);
        Ok(url)
    }

    /// Uploads a local file and returns an attachment pointing at it.
    ///
    /// The MIME type is guessed from the file extension when not given.
    pub async fn put_path(
        &self,
        path: impl AsRef<Path>,
        mime_type: Option<&str>,
    ) -> Result<Attachment> {
        self.active()?;
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| DialError::invalid(format!("no file name in {path:?}")))?;
        let mime_type = match mime_type {
            Some(mime_type) => mime_type.to_string(),
            None => mime_guess::from_path(path)
                .first()
                .ok_or_else(|| DialError::invalid(format!("Unknown MIME type for {path:?}")))?
                .to_string(),
        };

        let file = tokio::fs::File::open(path)
            .await
            .map_err(DialError::IoRead)?;
        let upload = self.put_file(name, &mime_type, file).await?;
        upload.to_attachment(name, mime_type)
    }

    fn download_url(&self, reference: &str) -> String {
        if reference.starts_with("http://") || reference.starts_with("https://") {
            reference.to_string()
        } else {
            format!(
                "{}/{}/{}",
                self.base_url,
                FILES_API_VERSION,
                reference.trim_start_matches('/')
            )
        }
    }

    /// Downloads the complete object addressed by `reference`.
    ///
    /// `reference` is either the canonical reference returned by an upload
    /// or an absolute URL, such as one produced by a model.
    ///
    /// # Errors
    ///
    /// * `NotAcquired` outside a session
    /// * `NotFound` if the reference does not resolve
    /// * `Download` on any other non-success response
    pub async fn get_file(&self, reference: &str) -> Result<Vec<u8>> {
        let session = self.active()?;
        if reference.trim().is_empty() {
            return Err(DialError::NotFound(reference.to_string()));
        }

        let url = self.download_url(reference);
        debug!(%url, "downloading file");
        let response = session.client.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(DialError::NotFound(reference.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(%status, reference, "download rejected");
            return Err(DialError::Download {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Downloads every attachment that carries a URL, in order.
    ///
    /// Attachments without a URL hold inline content that cannot be fetched
    /// from the bucket; they are logged and reported as skipped.
    pub async fn download_attachments(&self, attachments: &[Attachment]) -> Result<DownloadReport> {
        self.active()?;
        let mut report = DownloadReport::default();

        for (index, attachment) in attachments.iter().enumerate() {
            let Some(url) = attachment.url() else {
                warn!(
                    index,
                    title = attachment.title(),
                    "skipping attachment without url"
                );
                report.skipped.push(attachment.clone());
                continue;
            };

            let data = self.get_file(url).await?;
            report.files.push(DownloadedFile {
                index,
                attachment: attachment.clone(),
                data,
            });
        }

        Ok(report)
    }
}

async fn decode_upload_body<T: DeserializeOwned>(
    status: StatusCode,
    response: reqwest::Response,
) -> Result<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| DialError::Upload {
        status: status.as_u16(),
        message: format!("unparseable response: {e}: {body}"),
    })
}

/// A session on a [`DialBucketClient`] that is released on drop.
#[derive(Debug)]
pub struct BucketSession<'a> {
    client: &'a mut DialBucketClient,
}

impl Deref for BucketSession<'_> {
    type Target = DialBucketClient;

    fn deref(&self) -> &Self::Target {
        self.client
    }
}

impl Drop for BucketSession<'_> {
    fn drop(&mut self) {
        self.client.release();
    }
}

/// One attachment fetched by [`DialBucketClient::download_attachments`].
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// Position of the attachment in the input sequence
    pub index: usize,
    /// The attachment that was downloaded
    pub attachment: Attachment,
    /// The complete content
    pub data: Vec<u8>,
}

/// Outcome of [`DialBucketClient::download_attachments`].
#[derive(Debug, Clone, Default)]
pub struct DownloadReport {
    /// Downloaded attachments, in input order
    pub files: Vec<DownloadedFile>,
    /// Attachments skipped because they carried no URL
    pub skipped: Vec<Attachment>,
}

impl DownloadReport {
    /// Number of attachments that could not be fetched from the bucket.
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use serde_json::json;
    use tokio::io::ReadBuf;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API_KEY: &str = "test-key";

    struct FailingReader;

    impl AsyncRead for FailingReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::other("stream truncated")))
        }
    }

    async fn setup_mock_server() -> (MockServer, DialBucketClient) {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/bucket"))
            .and(header("api-key", API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "bucket": "b1" })))
            .mount(&mock_server)
            .await;

        let client = DialBucketClient::new(API_KEY, mock_server.uri());
        (mock_server, client)
    }

    #[tokio::test]
    async fn operations_require_a_session() {
        let client = DialBucketClient::new(API_KEY, "http://localhost:1");
        assert_eq!(client.state(), SessionState::Unacquired);

        let err = client
            .put_file("x.png", "image/png", &b"0123456789"[..])
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::NotAcquired));

        let err = client.get_file("files/b1/x.png").await.unwrap_err();
        assert!(matches!(err, DialError::NotAcquired));
    }

    #[test]
    fn acquiring_twice_fails() {
        let mut client = DialBucketClient::new(API_KEY, "http://localhost:1");
        client.acquire().unwrap();
        assert!(matches!(
            client.acquire().unwrap_err(),
            DialError::AlreadyAcquired
        ));
        client.release();
        assert_eq!(client.state(), SessionState::Unacquired);
        client.acquire().unwrap();
        assert_eq!(client.state(), SessionState::Acquired);
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let mut client = DialBucketClient::new("", "http://localhost:1");
        assert!(matches!(client.acquire().unwrap_err(), DialError::Config(_)));
        assert_eq!(client.state(), SessionState::Unacquired);
    }

    #[tokio::test]
    async fn upload_path_reference_then_download() {
        let (mock_server, mut client) = setup_mock_server().await;
        let content: Vec<u8> = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x01];

        Mock::given(method("PUT"))
            .and(path("/v1/files/b1/x.png"))
            .and(header("api-key", API_KEY))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "path": "/store/abc" })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/store/abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(content.clone()),
            )
            .mount(&mock_server)
            .await;

        let upload_content = content.clone();
        let (reference, downloaded) = client
            .scope(|bucket| {
                Box::pin(async move {
                    let upload = bucket
                        .put_file("x.png", "image/png", upload_content.as_slice())
                        .await?;
                    let reference = upload.reference().unwrap_or_default().to_string();
                    let downloaded = bucket.get_file(&reference).await?;
                    Ok((reference, downloaded))
                })
            })
            .await
            .unwrap();

        assert_eq!(reference, "/store/abc");
        assert_eq!(downloaded, content);
        assert_eq!(client.state(), SessionState::Unacquired);
    }

    #[tokio::test]
    async fn uploaded_bytes_reach_the_store() {
        let (mock_server, mut client) = setup_mock_server().await;
        let content = "plain text payload";

        Mock::given(method("PUT"))
            .and(path("/v1/files/b1/notes.txt"))
            .and(body_string_contains(content))
            .and(body_string_contains("name=\"attachment\""))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "url": "files/b1/notes.txt" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/files/b1/notes.txt"))
            .respond_with(ResponseTemplate::new(200).set_body_string(content))
            .mount(&mock_server)
            .await;

        let session = client.session().unwrap();
        let upload = session
            .put_file("notes.txt", "text/plain", content.as_bytes())
            .await
            .unwrap();
        let data = session
            .get_file(upload.reference().unwrap())
            .await
            .unwrap();
        assert_eq!(data, content.as_bytes());
    }

    #[tokio::test]
    async fn file_names_are_encoded_as_one_segment() {
        let (mock_server, mut client) = setup_mock_server().await;
        Mock::given(method("PUT"))
            .and(path("/v1/files/b1/report%20%231.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "url": "files/b1/report%20%231.png" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/files/b1/report%20%232.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "url": "files/b1/report%20%232.png" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/v1/files/b1/a%3Fb.png"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "url": "files/b1/a%3Fb.png" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let session = client.session().unwrap();
        let first = session
            .put_file("report #1.png", "image/png", &b"1"[..])
            .await
            .unwrap();
        let second = session
            .put_file("report #2.png", "image/png", &b"2"[..])
            .await
            .unwrap();
        let query_like = session
            .put_file("a?b.png", "image/png", &b"3"[..])
            .await
            .unwrap();

        assert_ne!(first.reference(), second.reference());
        assert_eq!(query_like.reference(), Some("files/b1/a%3Fb.png"));
    }

    #[tokio::test]
    async fn base_url_path_is_kept() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/dial/v1/bucket"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "bucket": "b1" })))
            .mount(&mock_server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/dial/v1/files/b1/x.png"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "url": "files/b1/x.png" })),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut client = DialBucketClient::new(API_KEY, format!("{}/dial/", mock_server.uri()));
        let session = client.session().unwrap();
        session.put_file("x.png", "image/png", &b"0"[..]).await.unwrap();
    }

    #[tokio::test]
    async fn unparseable_success_bodies_are_upload_errors() {
        let (mock_server, mut client) = setup_mock_server().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .mount(&mock_server)
            .await;

        let session = client.session().unwrap();
        let err = session
            .put_file("x.png", "image/png", &b"0"[..])
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::Upload { status: 200, .. }));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn unparseable_bucket_discovery_is_an_upload_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/bucket"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let mut client = DialBucketClient::new(API_KEY, mock_server.uri());
        let session = client.session().unwrap();
        let err = session
            .put_file("x.png", "image/png", &b"0"[..])
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::Upload { status: 200, .. }));
    }

    #[tokio::test]
    async fn bucket_is_discovered_once_per_session() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/bucket"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "bucket": "b1" })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": "files/b1/a" })))
            .expect(2)
            .mount(&mock_server)
            .await;

        let mut client = DialBucketClient::new(API_KEY, mock_server.uri());
        let session = client.session().unwrap();
        session.put_file("a", "text/plain", &b"1"[..]).await.unwrap();
        session.put_file("a", "text/plain", &b"2"[..]).await.unwrap();
    }

    #[tokio::test]
    async fn rejected_upload_surfaces_status() {
        let (mock_server, mut client) = setup_mock_server().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(413).set_body_string("file too large"))
            .mount(&mock_server)
            .await;

        let session = client.session().unwrap();
        let err = session
            .put_file("big.png", "image/png", &b"0"[..])
            .await
            .unwrap_err();
        match err {
            DialError::Upload { status, message } => {
                assert_eq!(status, 413);
                assert_eq!(message, "file too large");
            }
            other => panic!("expected upload error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn upload_without_reference_fails() {
        let (mock_server, mut client) = setup_mock_server().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "x.png" })))
            .mount(&mock_server)
            .await;

        let session = client.session().unwrap();
        let err = session
            .put_file("x.png", "image/png", &b"0"[..])
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::Upload { status: 200, .. }));
    }

    #[tokio::test]
    async fn unreadable_content_fails_before_any_request() {
        let mock_server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let mut client = DialBucketClient::new(API_KEY, mock_server.uri());
        let session = client.session().unwrap();
        let err = session
            .put_file("x.png", "image/png", FailingReader)
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::IoRead(_)));
    }

    #[tokio::test]
    async fn invalid_upload_arguments() {
        let mut client = DialBucketClient::new(API_KEY, "http://localhost:1");
        let session = client.session().unwrap();
        assert!(matches!(
            session.put_file("", "image/png", &b"0"[..]).await.unwrap_err(),
            DialError::InvalidRequest(_)
        ));
        assert!(matches!(
            session.put_file("x", "", &b"0"[..]).await.unwrap_err(),
            DialError::InvalidRequest(_)
        ));
        assert!(matches!(
            session.put_file("..", "image/png", &b"0"[..]).await.unwrap_err(),
            DialError::InvalidRequest(_)
        ));
    }

    #[tokio::test]
    async fn missing_and_failing_downloads() {
        let (mock_server, mut client) = setup_mock_server().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/b1/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/files/b1/broken.png"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&mock_server)
            .await;

        let session = client.session().unwrap();
        assert!(matches!(
            session.get_file("files/b1/missing.png").await.unwrap_err(),
            DialError::NotFound(reference) if reference == "files/b1/missing.png"
        ));
        assert!(matches!(
            session.get_file("files/b1/broken.png").await.unwrap_err(),
            DialError::Download { status: 503, .. }
        ));
    }

    #[tokio::test]
    async fn absolute_urls_are_fetched_directly() {
        let (mock_server, mut client) = setup_mock_server().await;
        Mock::given(method("GET"))
            .and(path("/generated/img.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&mock_server)
            .await;

        let url = format!("{}/generated/img.png", mock_server.uri());
        let session = client.session().unwrap();
        assert_eq!(session.get_file(&url).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn scope_releases_after_failure() {
        let (mock_server, mut client) = setup_mock_server().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let result = client
            .scope(|bucket| Box::pin(async move { bucket.get_file("files/b1/none").await }))
            .await;

        assert!(matches!(result, Err(DialError::NotFound(_))));
        assert_eq!(client.state(), SessionState::Unacquired);
        client.acquire().unwrap();
    }

    #[tokio::test]
    async fn cancelled_scope_still_releases() {
        let (mock_server, mut client) = setup_mock_server().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/b1/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&mock_server)
            .await;

        let outcome = tokio::time::timeout(
            Duration::from_millis(100),
            client.scope(|bucket| Box::pin(async move { bucket.get_file("files/b1/slow").await })),
        )
        .await;

        assert!(outcome.is_err());
        assert_eq!(client.state(), SessionState::Unacquired);
    }

    #[tokio::test]
    async fn concurrent_calls_share_one_session() {
        let (mock_server, mut client) = setup_mock_server().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/b1/a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("a"))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/files/b1/b"))
            .respond_with(ResponseTemplate::new(200).set_body_string("b"))
            .mount(&mock_server)
            .await;

        let session = client.session().unwrap();
        let (a, b) = futures::join!(session.get_file("files/b1/a"), session.get_file("files/b1/b"));
        assert_eq!(a.unwrap(), b"a");
        assert_eq!(b.unwrap(), b"b");
    }

    #[tokio::test]
    async fn download_report_counts_inline_attachments() {
        let (mock_server, mut client) = setup_mock_server().await;
        Mock::given(method("GET"))
            .and(path("/v1/files/b1/1.png"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 4]))
            .mount(&mock_server)
            .await;

        let attachments = vec![
            Attachment::new("inline", None, "image/png").unwrap(),
            Attachment::new("stored", Some("files/b1/1.png".to_string()), "image/png").unwrap(),
        ];

        let session = client.session().unwrap();
        let report = session.download_attachments(&attachments).await.unwrap();
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.skipped[0].title(), "inline");
        assert_eq!(report.files.len(), 1);
        assert_eq!(report.files[0].index, 1);
        assert_eq!(report.files[0].data, vec![7u8; 4]);
    }

    #[tokio::test]
    async fn put_path_guesses_mime_type() {
        let (mock_server, mut client) = setup_mock_server().await;
        let file = tempfile::Builder::new().suffix(".png").tempfile().unwrap();
        std::fs::write(file.path(), b"png-bytes").unwrap();
        let name = file
            .path()
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .to_string();

        Mock::given(method("PUT"))
            .and(path(format!("/v1/files/b1/{name}")))
            .and(body_string_contains("png-bytes"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "url": format!("files/b1/{name}") })),
            )
            .mount(&mock_server)
            .await;

        let session = client.session().unwrap();
        let attachment = session.put_path(file.path(), None).await.unwrap();
        assert_eq!(attachment.title(), name);
        assert_eq!(attachment.mime_type(), "image/png");
        assert_eq!(attachment.url(), Some(format!("files/b1/{name}").as_str()));
    }

    #[tokio::test]
    async fn put_path_reports_missing_file() {
        let mut client = DialBucketClient::new(API_KEY, "http://localhost:1");
        let session = client.session().unwrap();
        let err = session
            .put_path("/definitely/not/here.png", None)
            .await
            .unwrap_err();
        assert!(matches!(err, DialError::IoRead(_)));
    }
}
