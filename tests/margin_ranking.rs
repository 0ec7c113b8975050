//! Margin ranking loss integration tests

#[cfg(feature = "ndarray")]
mod ndarray_tests {
    use burn::backend::ndarray::NdArray;
    use burn::backend::Autodiff;
    use burn::tensor::{ElementConversion, Tensor, TensorData};
    use learning_loss_rs::ranking::margin_ranking_loss;

    type TestBackend = Autodiff<NdArray>;

    fn loss(pred: &[f32], target: &[f32], margin: f32) -> f32 {
        let device = Default::default();
        let pred = Tensor::<TestBackend, 1>::from_data(TensorData::new(pred.to_vec(), [pred.len()]), &device);
        let target = Tensor::<TestBackend, 1>::from_data(TensorData::new(target.to_vec(), [target.len()]), &device);
        margin_ranking_loss(pred, target, margin).into_scalar().elem()
    }

    #[test]
    fn test_penalty_grows_linearly_with_violation() {
        // True ordering a > b; predicted gap shrinks from 0.5 to -0.5.
        let target = [2.0, 1.0];
        let penalties: Vec<f32> = [0.5, 0.0, -0.5]
            .iter()
            .map(|gap| loss(&[*gap, 0.0], &target, 1.0))
            .collect();

        assert!((penalties[0] - 0.5).abs() < 1e-6);
        assert!((penalties[1] - 1.0).abs() < 1e-6);
        assert!((penalties[2] - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_mean_over_pairs() {
        // Pairs (0, 3) and (1, 2): the first is satisfied, the second is
        // reversed by 1.0 with margin 0.5.
        let value = loss(&[5.0, 0.0, 1.0, 0.0], &[4.0, 3.0, 1.0, 0.0], 0.5);
        assert!((value - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_gradient_reaches_predictions_only() {
        let device = Default::default();
        let pred = Tensor::<TestBackend, 1>::from_floats([0.0, 0.0], &device).require_grad();
        let target = Tensor::<TestBackend, 1>::from_floats([2.0, 1.0], &device).require_grad();

        let grads = margin_ranking_loss(pred.clone(), target.clone(), 1.0).backward();
        let pred_grad = pred.grad(&grads).expect("predictions are differentiated");
        assert_eq!(pred_grad.into_data().convert::<f32>().to_vec::<f32>().unwrap(), vec![-1.0, 1.0]);
        assert!(target.grad(&grads).is_none());
    }
}
