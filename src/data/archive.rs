// ============================================================
// Speech Archive Reader
// ============================================================
// Reads the pre-processed TIMIT archive. The archive is a
// safetensors file whose keys follow a fixed per-split layout:
//
//   <split>/inputs/data     f32 [utterances, max_frames, feat_dim]
//   <split>/inputs/seq_len  int [utterances]
//   <split>/<label>/values  int [nnz]
//   <split>/<label>/indices int [nnz, 2]   (utterance, position)
//   <split>/<label>/shape   int [2]
//
// with <split> in {train, valid, test} and <label> in {phn, char}.
// The label matrix is sparse COO; it is decoded straight into
// ragged per-utterance index sequences, never densified.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use safetensors::{Dtype, SafeTensors};

use crate::domain::labels::LabelKind;
use crate::domain::traits::CorpusSource;
use crate::domain::utterance::Utterance;

/// Handle on one archive file. The raw bytes are held for the
/// lifetime of the archive; safetensors parses lazily, so each
/// `load_split` only touches the tensors it names.
pub struct SpeechArchive {
    path: PathBuf,
    raw: Vec<u8>,
}

impl SpeechArchive {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let raw = std::fs::read(&path)
            .with_context(|| format!("cannot read dataset archive '{}'", path.display()))?;
        Ok(Self { path, raw })
    }

    fn tensors(&self) -> Result<SafeTensors<'_>> {
        SafeTensors::deserialize(&self.raw).map_err(|e| {
            anyhow::anyhow!("'{}' is not a safetensors archive: {e:?}", self.path.display())
        })
    }
}

impl CorpusSource for SpeechArchive {
    fn load_split(&self, split: &str, kind: LabelKind) -> Result<Vec<Utterance>> {
        let st = self.tensors()?;

        let (feat_shape, feat_data) = f32_tensor(&st, &format!("{split}/inputs/data"))?;
        ensure!(
            feat_shape.len() == 3,
            "{split}/inputs/data has rank {}, expected [utterances, frames, feat_dim]",
            feat_shape.len()
        );
        let [num_utts, max_frames, feat_dim] = [feat_shape[0], feat_shape[1], feat_shape[2]];

        let (len_shape, seq_len) = int_tensor(&st, &format!("{split}/inputs/seq_len"))?;
        ensure!(
            len_shape == vec![num_utts],
            "{split}/inputs/seq_len has shape {len_shape:?}, expected [{num_utts}]"
        );

        let labels = load_sparse_labels(&st, split, kind, num_utts)?;

        let mut utterances = Vec::with_capacity(num_utts);
        for (i, labels) in labels.into_iter().enumerate() {
            let frames = seq_len[i] as usize;
            ensure!(
                frames <= max_frames,
                "utterance {i} of '{split}' claims {frames} frames but the archive pads to {max_frames}"
            );
            let start = i * max_frames * feat_dim;
            let features = feat_data[start..start + frames * feat_dim].to_vec();
            utterances.push(Utterance::new(features, frames, feat_dim, labels));
        }

        tracing::info!(
            "loaded {} '{}' utterances ({} labels, feat_dim {})",
            utterances.len(),
            split,
            kind,
            feat_dim
        );
        Ok(utterances)
    }
}

/// Decode the COO triple of one label group into ragged sequences.
/// Entries carry (utterance, position) coordinates; they are sorted
/// by position per utterance, so on-disk ordering does not matter.
fn load_sparse_labels(
    st: &SafeTensors<'_>,
    split: &str,
    kind: LabelKind,
    num_utts: usize,
) -> Result<Vec<Vec<usize>>> {
    let group = format!("{split}/{kind}");

    let (val_shape, values) = int_tensor(st, &format!("{group}/values"))?;
    let (idx_shape, indices) = int_tensor(st, &format!("{group}/indices"))?;
    let (_, shape) = int_tensor(st, &format!("{group}/shape"))?;

    let nnz = val_shape[0];
    ensure!(
        idx_shape == vec![nnz, 2],
        "{group}/indices has shape {idx_shape:?}, expected [{nnz}, 2]"
    );
    ensure!(
        shape.len() == 2 && shape[0] as usize == num_utts,
        "{group}/shape is {shape:?}, expected [{num_utts}, _]"
    );

    let mut entries: Vec<Vec<(i64, usize)>> = vec![Vec::new(); num_utts];
    for i in 0..nnz {
        let utt = indices[2 * i];
        let pos = indices[2 * i + 1];
        ensure!(
            (0..num_utts as i64).contains(&utt),
            "{group}/indices entry {i} names utterance {utt}, but the split has {num_utts}"
        );
        entries[utt as usize].push((pos, values[i] as usize));
    }

    Ok(entries
        .into_iter()
        .map(|mut utt| {
            utt.sort_by_key(|&(pos, _)| pos);
            utt.into_iter().map(|(_, v)| v).collect()
        })
        .collect())
}

fn f32_tensor(st: &SafeTensors<'_>, name: &str) -> Result<(Vec<usize>, Vec<f32>)> {
    let view = st
        .tensor(name)
        .map_err(|e| anyhow::anyhow!("archive has no tensor '{name}': {e:?}"))?;
    ensure!(
        view.dtype() == Dtype::F32,
        "tensor '{name}' is {:?}, expected F32",
        view.dtype()
    );
    let data = view
        .data()
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect();
    Ok((view.shape().to_vec(), data))
}

fn int_tensor(st: &SafeTensors<'_>, name: &str) -> Result<(Vec<usize>, Vec<i64>)> {
    let view = st
        .tensor(name)
        .map_err(|e| anyhow::anyhow!("archive has no tensor '{name}': {e:?}"))?;
    let data = match view.dtype() {
        Dtype::I64 => view
            .data()
            .chunks_exact(8)
            .map(|b| i64::from_le_bytes([b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]]))
            .collect(),
        Dtype::I32 => view
            .data()
            .chunks_exact(4)
            .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]) as i64)
            .collect(),
        other => bail!("tensor '{name}' is {other:?}, expected an integer dtype"),
    };
    Ok((view.shape().to_vec(), data))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use safetensors::serialize_to_file;
    use safetensors::tensor::TensorView;

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn i64_bytes(values: &[i64]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    /// Two utterances, feat_dim 2, padded to 3 frames; utterance 0 has
    /// labels [4, 2], utterance 1 has [1]. Sparse entries are written
    /// out of order on purpose.
    fn write_archive(path: &Path) {
        let data: Vec<f32> = vec![
            1.0, 1.1, 2.0, 2.1, 3.0, 3.1, // utt 0, 3 frames
            5.0, 5.1, 6.0, 6.1, 0.0, 0.0, // utt 1, 2 frames + padding
        ];
        let seq_len: Vec<i64> = vec![3, 2];
        let values: Vec<i64> = vec![2, 4, 1];
        let indices: Vec<i64> = vec![0, 1, 0, 0, 1, 0];
        let shape: Vec<i64> = vec![2, 2];

        let data_b = f32_bytes(&data);
        let len_b = i64_bytes(&seq_len);
        let val_b = i64_bytes(&values);
        let idx_b = i64_bytes(&indices);
        let shape_b = i64_bytes(&shape);

        let tensors = vec![
            (
                "train/inputs/data".to_string(),
                TensorView::new(Dtype::F32, vec![2, 3, 2], &data_b).unwrap(),
            ),
            (
                "train/inputs/seq_len".to_string(),
                TensorView::new(Dtype::I64, vec![2], &len_b).unwrap(),
            ),
            (
                "train/phn/values".to_string(),
                TensorView::new(Dtype::I64, vec![3], &val_b).unwrap(),
            ),
            (
                "train/phn/indices".to_string(),
                TensorView::new(Dtype::I64, vec![3, 2], &idx_b).unwrap(),
            ),
            (
                "train/phn/shape".to_string(),
                TensorView::new(Dtype::I64, vec![2], &shape_b).unwrap(),
            ),
        ];
        serialize_to_file(tensors, &None, path).unwrap();
    }

    #[test]
    fn split_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timit.safetensors");
        write_archive(&path);

        let archive = SpeechArchive::open(&path).unwrap();
        let utts = archive.load_split("train", LabelKind::Phn).unwrap();

        assert_eq!(utts.len(), 2);
        // padding frames are trimmed
        assert_eq!(utts[0].num_frames, 3);
        assert_eq!(utts[1].num_frames, 2);
        assert_eq!(utts[1].features, vec![5.0, 5.1, 6.0, 6.1]);
        // out-of-order sparse entries come back position-sorted
        assert_eq!(utts[0].labels, vec![4, 2]);
        assert_eq!(utts[1].labels, vec![1]);
    }

    #[test]
    fn missing_split_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timit.safetensors");
        write_archive(&path);

        let archive = SpeechArchive::open(&path).unwrap();
        let err = archive.load_split("valid", LabelKind::Phn).unwrap_err();
        assert!(err.to_string().contains("valid/inputs/data"));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(SpeechArchive::open("/no/such/archive.safetensors").is_err());
    }
}
