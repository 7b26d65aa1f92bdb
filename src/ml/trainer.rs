// ============================================================
// Training Loop
// ============================================================
// Full train + validation loop over burn's DataLoader.
//
//   - Training runs on an AutodiffBackend; model.valid() gives
//     the inner-backend copy for gradient-free validation
//   - Optimiser: SGD with momentum and gradient-norm clipping,
//     matching the run's --lr / --momentum / --clipnorm
//   - Validation reports CTC loss and the label error rate of
//     greedy decoding; val_ler is the quantity the best-model
//     snapshot monitors
//   - Every epoch: latest weights + metadata document are
//     rewritten; best weights only on improvement

use std::time::Instant;

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer, SgdConfig, momentum::MomentumConfig},
    tensor::{
        ElementConversion,
        backend::{AutodiffBackend, Backend},
    },
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::CtcBatcher, dataset::UtteranceDataset};
use crate::domain::labels::LabelMap;
use crate::infra::{
    checkpoint::{BEST, CheckpointManager, LATEST},
    meta::MetaCheckpoint,
    metrics::{EpochMetrics, MetricsAccumulator},
};
use crate::ml::{
    ctc::CtcLossConfig,
    decoder::{CtcDecoder, label_error_rate},
    model::{AcousticModel, AcousticModelConfig},
};

#[allow(clippy::too_many_arguments)]
pub fn train<B: AutodiffBackend>(
    cfg: &TrainConfig,
    model_cfg: AcousticModelConfig,
    train_dataset: UtteranceDataset,
    val_dataset: UtteranceDataset,
    label_map: &LabelMap,
    ckpt: &CheckpointManager,
    meta: &mut MetaCheckpoint,
    device: B::Device,
) -> Result<()>
where
    B::InnerBackend: Backend,
{
    let mut model: AcousticModel<B> = model_cfg.init(&device);
    if let Some(load_dir) = &cfg.load {
        model = CheckpointManager::new(load_dir).load_model(model, LATEST, &device)?;
        tracing::info!("resumed weights from '{load_dir}'");
    }

    let optim_cfg = SgdConfig::new()
        .with_momentum(Some(MomentumConfig::new().with_momentum(cfg.momentum)))
        .with_gradient_clipping(Some(GradientClippingConfig::Norm(cfg.clipnorm)));
    let mut optim = optim_cfg.init();

    let ctc = CtcLossConfig::new(label_map.blank()).init();
    let decoder = CtcDecoder::new(label_map.blank());

    let train_loader = DataLoaderBuilder::new(CtcBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .shuffle(42)
        .num_workers(1)
        .build(train_dataset);

    let val_loader = DataLoaderBuilder::new(CtcBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let epoch_offset = meta.epoch_offset();
    let mut best_val_ler = f64::INFINITY;

    for epoch in 1..=cfg.nb_epoch {
        let started = Instant::now();

        // ── Training pass ─────────────────────────────────────────────────────
        let mut train_loss = MetricsAccumulator::new();
        for batch in train_loader.iter() {
            let log_probs = model.log_probs(batch.features);
            let loss = ctc.forward_mean(log_probs, &batch.labels, &batch.input_lengths);
            train_loss.add(loss.clone().into_scalar().elem::<f64>());

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        // ── Validation pass (inner backend, dropout disabled) ─────────────────
        let valid_model = model.valid();
        let mut val_loss = MetricsAccumulator::new();
        let mut val_ler = MetricsAccumulator::new();

        for batch in val_loader.iter() {
            let log_probs = valid_model.log_probs(batch.features);
            let loss = ctc.forward_mean(log_probs.clone(), &batch.labels, &batch.input_lengths);
            val_loss.add(loss.into_scalar().elem::<f64>());

            let [_, frames, classes] = log_probs.dims();
            let host = log_probs
                .into_data()
                .to_vec::<f32>()
                .map_err(|e| anyhow::anyhow!("cannot read validation activations: {e:?}"))?;
            for (i, reference) in batch.labels.iter().enumerate() {
                let utt = &host[i * frames * classes..(i + 1) * frames * classes];
                let hypothesis = decoder.greedy(utt, batch.input_lengths[i], classes);
                val_ler.add(label_error_rate(&hypothesis, reference));
            }
        }

        let metrics = EpochMetrics {
            epoch: epoch_offset + epoch,
            train_loss: train_loss.mean(),
            val_loss: val_loss.mean(),
            val_ler: val_ler.mean(),
            duration_secs: started.elapsed().as_secs_f64(),
        };
        metrics.print();

        meta.on_epoch_end(
            epoch,
            &[
                ("loss", metrics.train_loss),
                ("val_loss", metrics.val_loss),
                ("val_ler", metrics.val_ler),
            ],
        )?;
        ckpt.save_model(&model, LATEST)?;

        if metrics.is_improvement(best_val_ler) {
            best_val_ler = metrics.val_ler;
            ckpt.save_model(&model, BEST)?;
            tracing::info!("new best val_ler {:.4} at epoch {}", best_val_ler, metrics.epoch);
        }
    }

    println!(
        "Training finished: {} epochs, best val_ler {:.4}",
        cfg.nb_epoch, best_val_ler
    );
    Ok(())
}
