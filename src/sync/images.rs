//! Image reference validation
//!
//! Every `img` with a relative `src` is checked against the target project's
//! image root. Missing images are flagged with `data-image-status="missing"`
//! so the editor can highlight them; images that exist lose any stale flag.

use log::debug;
use xot::{Node, Xot};

use super::{elements_with_attribute, StageInput, SyncStage};
use crate::document::{is_named, remove_attribute, set_attribute};
use crate::error::Result;
use crate::project::data_path;

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageSync;

impl SyncStage for ImageSync {
    fn name(&self) -> &'static str {
        "images"
    }

    fn sync(&self, xot: &mut Xot, document: Node, input: &StageInput<'_>) -> Result<()> {
        for (element, src) in elements_with_attribute(xot, document, "src") {
            if !is_named(xot, element, "img") || is_external(&src) {
                continue;
            }
            let exists = data_path(input.images_root, src.trim_start_matches('/'))
                .map(|path| path.is_file())
                .unwrap_or(false);
            if exists {
                remove_attribute(xot, element, &input.markup.image_status_attribute);
            } else {
                debug!(
                    "Image '{}' referenced from {} is missing",
                    src,
                    input.file_path.display()
                );
                set_attribute(xot, element, &input.markup.image_status_attribute, "missing");
            }
        }
        Ok(())
    }
}

fn is_external(src: &str) -> bool {
    src.contains("://") || src.starts_with("data:")
}
