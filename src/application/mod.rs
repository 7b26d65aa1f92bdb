// ============================================================
// Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal each: training a
// model or evaluating a saved one. Workflow coordination only —
// no tensor math, no argument parsing, no direct rendering.

use std::str::FromStr;

use anyhow::{Result, bail};

use crate::domain::{labels::LabelMap, utterance::Utterance};

// The training workflow
pub mod train_use_case;

// The evaluation/decoding workflow
pub mod eval_use_case;

/// Which compute backend a run should use. Parsed from the
/// `--device` argument: `cpu`, `gpu`, `gpu:<index>` or `all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceSpec {
    Cpu,
    Gpu(Option<usize>),
}

impl FromStr for DeviceSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(DeviceSpec::Cpu),
            "gpu" | "all" => Ok(DeviceSpec::Gpu(None)),
            other => match other.strip_prefix("gpu:") {
                Some(idx) => Ok(DeviceSpec::Gpu(Some(idx.parse().map_err(|_| {
                    anyhow::anyhow!("invalid gpu index in device '{other}'")
                })?))),
                None => bail!("unknown device '{other}' (expected cpu, gpu or gpu:<index>)"),
            },
        }
    }
}

/// Every label index in the corpus must name a real dictionary symbol.
pub(crate) fn check_label_range(utterances: &[Utterance], map: &LabelMap) -> Result<()> {
    for (i, utt) in utterances.iter().enumerate() {
        if let Some(&bad) = utt.labels.iter().find(|&&l| l >= map.len()) {
            bail!(
                "utterance {i} carries label index {bad}, but the {} dictionary has only {} symbols",
                map.kind(),
                map.len()
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_spec_parsing() {
        assert_eq!("cpu".parse::<DeviceSpec>().unwrap(), DeviceSpec::Cpu);
        assert_eq!("gpu".parse::<DeviceSpec>().unwrap(), DeviceSpec::Gpu(None));
        assert_eq!("all".parse::<DeviceSpec>().unwrap(), DeviceSpec::Gpu(None));
        assert_eq!("gpu:1".parse::<DeviceSpec>().unwrap(), DeviceSpec::Gpu(Some(1)));
        assert!("tpu".parse::<DeviceSpec>().is_err());
        assert!("gpu:x".parse::<DeviceSpec>().is_err());
    }

    #[test]
    fn label_range_check() {
        let map = LabelMap::char_map();
        let good = vec![Utterance::new(vec![0.0; 2], 1, 2, vec![0, 27])];
        assert!(check_label_range(&good, &map).is_ok());

        let bad = vec![Utterance::new(vec![0.0; 2], 1, 2, vec![28])];
        assert!(check_label_range(&bad, &map).is_err());
    }
}
