use core::fmt::Debug;
use std::{
    io::{Error, ErrorKind},
    path::PathBuf,
};

use eyre::{Context, Result};
use tokio::fs::try_exists;
use tracing::debug;

use crate::{config::Settings, error::PlotError};

#[async_trait::async_trait]
pub trait Plot: Debug + Send + Sync {
    /// Short name used in logs and error context
    fn name(&self) -> &'static str;
    /// Files the plot reads. All of them must exist before anything is rendered.
    fn required_inputs(&self) -> Vec<PathBuf>;
    /// Reads the inputs, renders the image(s) and prints the results to stdout
    async fn plot(&self, settings: &Settings) -> Result<()>;
}

/// Checks the plot's inputs and runs it.
pub async fn plot(plot: &dyn Plot, settings: &Settings) -> Result<()> {
    for input in plot.required_inputs() {
        if !try_exists(&input).await.unwrap_or(false) {
            return Err(PlotError::FileAccess {
                path: input,
                source: Error::new(ErrorKind::NotFound, "input file not found"),
            }
            .into());
        }
    }

    debug!("Running {} plot", plot.name());
    plot.plot(settings)
        .await
        .wrap_err_with(|| format!("{} plot failed", plot.name()))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[derive(Debug, Default)]
    struct Probe {
        input: PathBuf,
        ran: AtomicBool,
    }

    #[async_trait::async_trait]
    impl Plot for Probe {
        fn name(&self) -> &'static str {
            "probe"
        }

        fn required_inputs(&self) -> Vec<PathBuf> {
            vec![self.input.clone()]
        }

        async fn plot(&self, _settings: &Settings) -> Result<()> {
            self.ran.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn missing_input_stops_before_plotting() {
        let dir = tempfile::tempdir().unwrap();
        let probe = Probe {
            input: dir.path().join("missing.csv"),
            ..Default::default()
        };
        let err = plot(&probe, &Settings::default()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PlotError>(),
            Some(PlotError::FileAccess { .. })
        ));
        assert!(!probe.ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn present_input_runs_plot() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("present.csv");
        std::fs::write(&input, "a\n1\n").unwrap();
        let probe = Probe {
            input,
            ..Default::default()
        };
        plot(&probe, &Settings::default()).await.unwrap();
        assert!(probe.ran.load(Ordering::SeqCst));
    }
}
