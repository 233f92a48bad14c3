use super::error::ApiError;
use crate::config::{parse_match_limit, StitchConfig};
use crate::logging::RequestSpan;
use axum::body::Bytes;
use axum::extract::Multipart;
use std::str::FromStr;

/// Parsed `POST /stitch` form.
#[derive(Debug)]
pub struct StitchForm {
    pub image1: Bytes,
    pub image2: Bytes,
    pub config: StitchConfig,
}

impl StitchForm {
    /// Read every field; parameters missing from the form keep `defaults`.
    pub async fn read(
        mut multipart: Multipart,
        defaults: &StitchConfig,
        span: &RequestSpan,
    ) -> Result<Self, ApiError> {
        let mut image1 = None;
        let mut image2 = None;
        let mut config = defaults.clone();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "image1" | "image2" => {
                    let data = field.bytes().await?;
                    span.record_upload(&name, data.len());
                    if name == "image1" {
                        image1 = Some(data);
                    } else {
                        image2 = Some(data);
                    }
                }
                _ => {
                    let value = field.text().await?;
                    apply_form_field(&mut config, &name, &value)
                        .map_err(|detail| ApiError::unprocessable("InvalidParameter", detail))?;
                }
            }
        }

        let image1 = image1.ok_or_else(|| ApiError::unprocessable("MissingField", "missing file field: image1"))?;
        let image2 = image2.ok_or_else(|| ApiError::unprocessable("MissingField", "missing file field: image2"))?;
        config
            .validate()
            .map_err(|errors| ApiError::unprocessable("InvalidConfig", errors.join("; ")))?;

        Ok(Self {
            image1,
            image2,
            config,
        })
    }
}

/// Apply one camelCase form parameter to `config`. Unknown names are ignored.
pub fn apply_form_field(config: &mut StitchConfig, name: &str, value: &str) -> Result<(), String> {
    match name {
        "sigma" => config.sigma = parse_number(name, value)?,
        "harrisThreshold" => config.harris_threshold = parse_number(name, value)?,
        "harrisWindowRadius" => config.harris_window_radius = parse_number(name, value)?,
        "siftEnlarge" => config.sift_enlarge = parse_number(name, value)?,
        "maxSize" => config.max_size = parse_number(name, value)?,
        "maxCorners" => config.max_corners = parse_number(name, value)?,
        "maxDescriptorMatches" => config.max_descriptor_matches = parse_match_limit(value)?,
        "ransacIters" => config.ransac_iters = parse_number(name, value)?,
        "ransacThreshold" => config.ransac_threshold = parse_number(name, value)?,
        "ransacSeed" => config.ransac_seed = Some(parse_number(name, value)?),
        _ => tracing::debug!(field = name, "Ignoring unknown form field"),
    }
    Ok(())
}

fn parse_number<T: FromStr>(name: &str, value: &str) -> Result<T, String> {
    value
        .trim()
        .parse()
        .map_err(|_| format!("invalid value for {name}: {value:?}"))
}
