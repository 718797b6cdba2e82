use std::{fs, path::Path};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{HubError, IoContext, Result};

static FIXED_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"fixed_shape_resizer\s*\{([^}]*)\}").expect("fixed_shape_resizer pattern")
});
static KEEP_ASPECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"keep_aspect_ratio_resizer\s*\{([^}]*)\}").expect("keep_aspect_ratio_resizer pattern")
});
static HEIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bheight\s*:\s*(\d+)").expect("height pattern"));
static WIDTH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bwidth\s*:\s*(\d+)").expect("width pattern"));
static MAX_DIMENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bmax_dimension\s*:\s*(\d+)").expect("max_dimension pattern"));

/// Input size the model's image resizer expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputDimensions {
    pub height: u32,
    pub width: u32,
}

pub fn dims_from_config(path: &Path) -> Result<InputDimensions> {
    let text =
        fs::read_to_string(path).io_context(|| format!("read pipeline config {}", path.display()))?;
    parse_dimensions(&text).ok_or_else(|| HubError::InvalidConfig {
        path: path.to_path_buf(),
        reason: "no fixed_shape_resizer or keep_aspect_ratio_resizer dimensions".into(),
    })
}

pub fn parse_dimensions(text: &str) -> Option<InputDimensions> {
    if let Some(block) = FIXED_SHAPE.captures(text).and_then(|caps| caps.get(1)) {
        let height = capture_u32(&HEIGHT, block.as_str());
        let width = capture_u32(&WIDTH, block.as_str());
        if let (Some(height), Some(width)) = (height, width) {
            return Some(InputDimensions { height, width });
        }
    }

    let block = KEEP_ASPECT.captures(text)?.get(1)?;
    let side = capture_u32(&MAX_DIMENSION, block.as_str())?;
    Some(InputDimensions {
        height: side,
        width: side,
    })
}

fn capture_u32(pattern: &Regex, text: &str) -> Option<u32> {
    pattern.captures(text)?.get(1)?.as_str().parse().ok()
}
