use tracing::info;

use crate::extract::ExtractedJobData;

/// The on-page hook the user clicks to start a cover letter. Kept apart from
/// detection so scans can run without anything rendered.
pub trait Affordance {
    fn show(&mut self, data: &ExtractedJobData);
    fn hide(&mut self);
}

/// Reports the affordance through the log instead of drawing it.
#[derive(Debug, Default)]
pub struct LogAffordance {
    visible: bool,
}

impl LogAffordance {
    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl Affordance for LogAffordance {
    fn show(&mut self, data: &ExtractedJobData) {
        if self.visible {
            return;
        }
        self.visible = true;
        info!(
            "Generate Cover Letter available: {} at {}",
            data.title, data.company
        );
    }

    fn hide(&mut self) {
        if self.visible {
            self.visible = false;
            info!("Generate Cover Letter hidden");
        }
    }
}
