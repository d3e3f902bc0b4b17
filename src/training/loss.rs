use burn::tensor::{backend::Backend, Int, Tensor};

use crate::model::ConditionalDiscriminator;

/// Binary classification targets for one batch
#[derive(Debug, Clone)]
pub struct Targets<B: Backend> {
    /// All ones: "this pair is real"
    pub valid: Tensor<B, 1>,
    /// All zeros: "this pair is generated"
    pub fake: Tensor<B, 1>,
}

impl<B: Backend> Targets<B> {
    pub fn new(batch_size: usize, device: &B::Device) -> Self {
        Self {
            valid: Tensor::ones([batch_size], device),
            fake: Tensor::zeros([batch_size], device),
        }
    }
}

/// Mean binary cross-entropy between probabilities and targets.
///
/// Each log term is clamped at -100 so saturated predictions give a large but
/// finite loss.
pub fn binary_cross_entropy<B: Backend>(
    probabilities: Tensor<B, 1>,
    targets: Tensor<B, 1>,
) -> Tensor<B, 1> {
    let log_p = probabilities.clone().log().clamp_min(-100.0);
    let log_not_p = probabilities.neg().add_scalar(1.0).log().clamp_min(-100.0);
    let not_targets = targets.clone().neg().add_scalar(1.0);

    (targets * log_p + not_targets * log_not_p).neg().mean()
}

/// Generator objective: the discriminator should call generated pairs real
pub fn generator_loss<B: Backend, D: ConditionalDiscriminator<B>>(
    discriminator: &D,
    generated: Tensor<B, 4>,
    labels: Tensor<B, 1, Int>,
    targets: &Targets<B>,
) -> Tensor<B, 1> {
    binary_cross_entropy(
        discriminator.classify(generated, labels),
        targets.valid.clone(),
    )
}

/// Discriminator objective, averaged over the real and generated halves.
///
/// `generated` is detached here, so this loss never sends gradients back into
/// whatever produced it.
pub fn discriminator_loss<B: Backend, D: ConditionalDiscriminator<B>>(
    discriminator: &D,
    real: Tensor<B, 4>,
    generated: Tensor<B, 4>,
    labels: Tensor<B, 1, Int>,
    targets: &Targets<B>,
) -> Tensor<B, 1> {
    let real_loss = binary_cross_entropy(
        discriminator.classify(real, labels.clone()),
        targets.valid.clone(),
    );
    let fake_loss = binary_cross_entropy(
        discriminator.classify(generated.detach(), labels),
        targets.fake.clone(),
    );

    (real_loss + fake_loss) / 2.0f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        tensor::{ElementConversion, TensorData},
    };

    type TestBackend = NdArray<f32>;

    fn tensor(values: Vec<f32>) -> Tensor<TestBackend, 1> {
        let len = values.len();
        Tensor::from_data(TensorData::new(values, [len]), &NdArrayDevice::default())
    }

    fn scalar(loss: Tensor<TestBackend, 1>) -> f64 {
        loss.into_scalar().elem::<f64>()
    }

    #[test]
    fn targets_have_one_entry_per_image() {
        let device = NdArrayDevice::default();
        for batch_size in [1, 3, 64] {
            let targets = Targets::<TestBackend>::new(batch_size, &device);

            let valid = targets.valid.into_data().to_vec::<f32>().unwrap();
            let fake = targets.fake.into_data().to_vec::<f32>().unwrap();

            assert_eq!(valid, vec![1.0; batch_size]);
            assert_eq!(fake, vec![0.0; batch_size]);
        }
    }

    #[test]
    fn uncertain_predictions_cost_ln_two() {
        let loss = scalar(binary_cross_entropy(
            tensor(vec![0.5, 0.5]),
            tensor(vec![1.0, 0.0]),
        ));

        assert!((loss - std::f64::consts::LN_2).abs() < 1e-6);
    }

    #[test]
    fn confident_correct_predictions_cost_nothing() {
        let loss = scalar(binary_cross_entropy(
            tensor(vec![1.0, 0.0]),
            tensor(vec![1.0, 0.0]),
        ));

        assert!(loss.abs() < 1e-6);
    }

    #[test]
    fn confident_wrong_predictions_are_clamped() {
        let loss = scalar(binary_cross_entropy(tensor(vec![0.0]), tensor(vec![1.0])));

        assert!((loss - 100.0).abs() < 1e-3);
    }

    #[test]
    fn mixed_batch_matches_hand_computed_mean() {
        let loss = scalar(binary_cross_entropy(
            tensor(vec![0.9, 0.2]),
            tensor(vec![1.0, 1.0]),
        ));

        let expected = -(0.9f64.ln() + 0.2f64.ln()) / 2.0;
        assert!((loss - expected).abs() < 1e-5);
    }
}
