//! Progress indicators for aclsync CLI.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.green} {prefix} [{bar:30.cyan/blue}] {pos}/{len} {msg}";

/// Progress bar over a known number of steps
///
/// Hidden when `quiet` is set so log-only runs stay clean.
pub fn bar(len: u64, prefix: &str, quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-");
    pb.set_style(style);
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_parses() {
        assert!(ProgressStyle::default_bar().template(BAR_TEMPLATE).is_ok());
    }

    #[test]
    fn test_quiet_bar_is_hidden() {
        let pb = bar(3, "Applying", true);
        assert!(pb.is_hidden());
        pb.inc(1);
        assert_eq!(pb.position(), 1);
    }
}
