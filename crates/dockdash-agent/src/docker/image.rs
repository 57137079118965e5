//! Image refresh before a replacement

use super::engine::ContainerEngine;
use tracing::{debug, info, warn};

/// Result of an optional pull
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageRefresh {
    /// The pull moved the reference to a different image ID
    pub pulled_new: bool,
    pub warning: Option<String>,
}

impl ImageRefresh {
    fn warn(message: String) -> Self {
        warn!("{}", message);
        Self {
            pulled_new: false,
            warning: Some(message),
        }
    }
}

/// Pull `image` and report whether a new version arrived
///
/// `current_id` is the image ID the container runs; when unknown the local
/// image is looked up instead. Failures never abort: the replacement then
/// proceeds with whatever image is available locally.
pub async fn refresh_image(
    engine: &dyn ContainerEngine,
    image: &str,
    current_id: Option<&str>,
) -> ImageRefresh {
    if image.starts_with("sha256:") {
        return ImageRefresh::warn(format!(
            "Image {} is referenced by ID and cannot be pulled",
            image
        ));
    }

    let before = match current_id.filter(|id| !id.is_empty()) {
        Some(id) => Some(id.to_string()),
        None => engine.image_id(image).await.ok().flatten(),
    };

    if let Err(e) = engine.pull_image(image).await {
        return ImageRefresh::warn(format!(
            "Failed to pull {}, using local image: {}",
            image, e
        ));
    }

    let after = match engine.image_id(image).await {
        Ok(id) => id,
        Err(e) => {
            return ImageRefresh::warn(format!(
                "Pulled {} but could not read its image ID: {}",
                image, e
            ))
        }
    };

    let pulled_new = match (&before, &after) {
        (Some(before), Some(after)) => before != after,
        (None, Some(_)) => true,
        _ => false,
    };

    if pulled_new {
        info!("Pulled new version of {}", image);
    } else {
        debug!("Image {} is up to date", image);
    }

    ImageRefresh {
        pulled_new,
        warning: None,
    }
}
