//! `POST /api/process`: multipart upload in, encoded image out.
//!
//! Fields:
//!
//! - `image`: the source file
//! - `width`, `height`: optional target box; either one enables a contain-fit resize
//! - `format`: `jpeg` (or `jpg`), `png`, `webp` or `avif`
//! - `quality`: integer, clamped into `1..=100`
//!
//! Empty text fields count as absent and unknown fields are ignored.

use axum::{
    body::Bytes,
    extract::{Multipart, State},
    http::header,
    response::{IntoResponse, Response},
};
use pixelsmith_core::{OutputFormat, TransformError, TransformRequest};
use tokio::sync::oneshot;
use tracing::debug;

use super::{AppError, AppState};

#[derive(Debug, Default)]
struct ProcessForm {
    image: Option<Bytes>,
    width: Option<String>,
    height: Option<String>,
    format: Option<String>,
    quality: Option<String>,
}

impl ProcessForm {
    async fn read(multipart: &mut Multipart) -> Result<Self, AppError> {
        let mut form = ProcessForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image" => form.image = Some(field.bytes().await?),
                "width" => form.width = non_empty(field.text().await?),
                "height" => form.height = non_empty(field.text().await?),
                "format" => form.format = non_empty(field.text().await?),
                "quality" => form.quality = non_empty(field.text().await?),
                other => debug!("ignoring multipart field {:?}", other),
            }
        }

        Ok(form)
    }

    fn to_request(
        &self,
        default_format: OutputFormat,
        default_quality: u8,
    ) -> Result<TransformRequest, TransformError> {
        let width = self
            .width
            .as_deref()
            .map(|v| parse_dimension("width", v))
            .transpose()?;
        let height = self
            .height
            .as_deref()
            .map(|v| parse_dimension("height", v))
            .transpose()?;
        let format = match self.format.as_deref() {
            Some(value) => value.parse::<OutputFormat>()?,
            None => default_format,
        };
        let quality = match self.quality.as_deref() {
            Some(value) => value.trim().parse::<i64>().map_err(|_| {
                TransformError::invalid(format!("quality must be an integer, got {:?}", value))
            })?,
            None => default_quality as i64,
        };

        let mut builder = TransformRequest::builder().format(format).quality(quality);
        if width.is_some() || height.is_some() {
            builder = builder.resize(width, height);
        }
        Ok(builder.build())
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

fn parse_dimension(name: &str, value: &str) -> Result<u32, TransformError> {
    value.trim().parse::<u32>().map_err(|_| {
        TransformError::invalid(format!(
            "{} must be a positive integer, got {:?}",
            name, value
        ))
    })
}

pub async fn process(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let form = ProcessForm::read(&mut multipart).await?;
    let request = form.to_request(state.default_format, state.default_quality)?;
    let pipeline = state.pipeline;

    // Decoding and encoding are CPU bound; keep them off the async workers.
    let (send, recv) = oneshot::channel();
    rayon::spawn(move || {
        let result = pipeline.process(form.image.as_deref(), &request);
        let _ = send.send(result);
    });
    let output = recv.await.map_err(|_| AppError::WorkerGone)??;

    Ok(([(header::CONTENT_TYPE, output.mime_type())], output.bytes).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixelsmith_core::pipeline::Operation;
    use pixelsmith_core::Limits;

    fn form(
        width: Option<&str>,
        height: Option<&str>,
        format: Option<&str>,
        quality: Option<&str>,
    ) -> ProcessForm {
        ProcessForm {
            image: None,
            width: width.map(String::from),
            height: height.map(String::from),
            format: format.map(String::from),
            quality: quality.map(String::from),
        }
    }

    #[test]
    fn test_defaults_apply() {
        let request = form(None, None, None, None)
            .to_request(OutputFormat::Jpeg, 80)
            .unwrap();
        assert_eq!(request.output.format, OutputFormat::Jpeg);
        assert_eq!(request.output.quality, 80);
        assert!(request.resize.is_none());
        assert_eq!(request.validate(&Limits::default()).unwrap(), Operation::Passthrough);
    }

    #[test]
    fn test_single_side_enables_resize() {
        let request = form(Some("300"), None, Some("PNG"), Some("55"))
            .to_request(OutputFormat::Jpeg, 80)
            .unwrap();
        let resize = request.resize.unwrap();
        assert_eq!(resize.width, Some(300));
        assert_eq!(resize.height, None);
        assert_eq!(request.output.format, OutputFormat::Png);
        assert_eq!(request.output.quality, 55);
    }

    #[test]
    fn test_quality_is_clamped() {
        let high = form(None, None, None, Some("500"))
            .to_request(OutputFormat::Jpeg, 80)
            .unwrap();
        let low = form(None, None, None, Some("-3"))
            .to_request(OutputFormat::Jpeg, 80)
            .unwrap();
        assert_eq!(high.output.quality, 100);
        assert_eq!(low.output.quality, 1);
    }

    #[test]
    fn test_malformed_fields() {
        let err = form(Some("wide"), None, None, None)
            .to_request(OutputFormat::Jpeg, 80)
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidParameters(_)));

        let err = form(None, Some("-10"), None, None)
            .to_request(OutputFormat::Jpeg, 80)
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidParameters(_)));

        let err = form(None, None, None, Some("high"))
            .to_request(OutputFormat::Jpeg, 80)
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidParameters(_)));

        let err = form(None, None, Some("gif"), None)
            .to_request(OutputFormat::Jpeg, 80)
            .unwrap_err();
        assert!(matches!(err, TransformError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_non_empty() {
        assert_eq!(non_empty("  ".to_string()), None);
        assert_eq!(non_empty("10".to_string()), Some("10".to_string()));
    }
}
