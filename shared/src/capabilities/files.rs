use crux_core::capability::{CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const JPEG_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum FileOperation {
    /// Reads `source_uri` on the device and stores it at `path` in the bucket.
    Upload {
        path: String,
        source_uri: String,
        content_type: String,
    },
    DownloadUrl {
        path: String,
    },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum FileError {
    #[error("could not read local file '{uri}': {message}")]
    Read { uri: String, message: String },

    #[error("upload failed: {message}")]
    Upload { message: String },

    #[error("download URL unavailable: {message}")]
    DownloadUrl { message: String },

    #[error("unexpected file store response")]
    UnexpectedOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "data")]
pub enum FileOutput {
    Uploaded { path: String },
    Url(String),
}

pub type FileResult = Result<FileOutput, FileError>;

impl Operation for FileOperation {
    type Output = FileResult;
}

#[derive(crux_core::macros::Capability)]
pub struct FileStore<Ev> {
    context: CapabilityContext<FileOperation, Ev>,
}

impl<Ev> FileStore<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<FileOperation, Ev>) -> Self {
        Self { context }
    }

    /// Uploads then resolves the public download URL.
    pub fn upload<F>(&self, path: String, source_uri: String, content_type: &str, make_event: F)
    where
        F: FnOnce(Result<String, FileError>) -> Ev + Send + 'static,
    {
        let content_type = content_type.to_string();
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let result = upload_then_resolve(&ctx, path, source_uri, content_type).await;
            ctx.update_app(make_event(result));
        });
    }
}

async fn upload_then_resolve<Ev: 'static>(
    ctx: &CapabilityContext<FileOperation, Ev>,
    path: String,
    source_uri: String,
    content_type: String,
) -> Result<String, FileError> {
    let stored_path = match ctx
        .request_from_shell(FileOperation::Upload {
            path,
            source_uri,
            content_type,
        })
        .await?
    {
        FileOutput::Uploaded { path } => path,
        FileOutput::Url(_) => return Err(FileError::UnexpectedOutput),
    };

    match ctx
        .request_from_shell(FileOperation::DownloadUrl { path: stored_path })
        .await?
    {
        FileOutput::Url(url) => Ok(url),
        FileOutput::Uploaded { .. } => Err(FileError::UnexpectedOutput),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_error_messages_name_the_stage() {
        let err = FileError::Read {
            uri: "file:///tmp/a.jpg".to_string(),
            message: "missing".to_string(),
        };
        assert!(err.to_string().contains("file:///tmp/a.jpg"));
        assert!(FileError::Upload {
            message: "quota".to_string()
        }
        .to_string()
        .starts_with("upload failed"));
    }
}
