//! Runtime controls: calibration trigger, mode selector, smoothing factor.

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One operator command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Calibrate,
    CalibrateMultiStep,
    CancelCalibration,
    CycleMode,
    FactorUp,
    FactorDown,
}

impl Control {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "c" => Some(Control::Calibrate),
            "C" => Some(Control::CalibrateMultiStep),
            "x" => Some(Control::CancelCalibration),
            "m" => Some(Control::CycleMode),
            "+" => Some(Control::FactorUp),
            "-" => Some(Control::FactorDown),
            _ => None,
        }
    }
}

/// Forward stdin lines as controls until stdin closes
pub fn spawn_stdin_controls() -> mpsc::Receiver<Control> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match Control::parse(&line) {
                    Some(control) => {
                        if tx.send(control).await.is_err() {
                            break;
                        }
                    }
                    None => warn!(input = %line.trim(), "unknown control"),
                },
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    break;
                }
            }
        }
        debug!("control input closed");
    });
    rx
}
