use nnet_dense::config::{DenseConfig, N_INPUT_1_1, N_LAYER_2};
use nnet_dense::{DenseError, DenseKernel, Fixed, QTensor, ShapeError, Stream};
use pretty_assertions::assert_eq;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

fn kernel(n_in: usize, n_out: usize, weights: &[f64], biases: &[f64]) -> DenseKernel {
    DenseKernel::builder(DenseConfig::with_shape(n_in, n_out))
        .parameters_f64(weights, biases)
        .unwrap()
        .build()
        .unwrap()
}

fn random_kernel(seed: u64) -> DenseKernel {
    let mut rng = SmallRng::seed_from_u64(seed);
    let w: Vec<f64> = (0..N_INPUT_1_1 * N_LAYER_2).map(|_| rng.gen_range(-1.0..1.0)).collect();
    let b: Vec<f64> = (0..N_LAYER_2).map(|_| rng.gen_range(-8.0..8.0)).collect();
    kernel(N_INPUT_1_1, N_LAYER_2, &w, &b)
}

fn random_input(seed: u64, n: usize) -> Vec<f64> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n).map(|_| rng.gen_range(-2048..2048) as f64).collect()
}

#[test]
fn all_ones_weights_sum_the_input() {
    let k = kernel(4, 2, &[1.0; 8], &[0.0, 0.0]);
    let out = k.forward_f64(&[1.0, 1.0, 1.0, 1.0]).unwrap();
    assert_eq!(out.to_f64s(), vec![4.0, 4.0]);
}

#[test]
fn zero_input_yields_bias() {
    let k = kernel(4, 2, &[0.25, -3.0, 7.5, 1.0, -0.5, 2.0, 9.0, -1.0], &[1.5, -2.25]);
    let out = k.forward_f64(&[0.0; 4]).unwrap();
    assert_eq!(out.to_f64s(), vec![1.5, -2.25]);
    assert_eq!(out.spec(), k.config().precision.result);
}

#[test]
fn weights_are_row_major_by_input_index() {
    // w[i * n_out + j] connects input i to output j
    let w = [1.0, 10.0, 2.0, 20.0, 3.0, 30.0];
    let k = kernel(3, 2, &w, &[0.0, 0.5]);
    let out = k.forward_f64(&[1.0, 2.0, 3.0]).unwrap();
    assert_eq!(out.to_f64s(), vec![14.0, 140.5]);
}

#[test]
fn fractional_weights_with_integer_input() {
    // ap_fixed<22,14> holds 1/256 steps; -0.3 truncates to -77/256
    let k = kernel(2, 1, &[0.5, -0.3], &[0.125]);
    let out = k.forward_f64(&[3.0, 2.0]).unwrap();
    assert_eq!(out.to_f64s(), vec![1.5 - 2.0 * 77.0 / 256.0 + 0.125]);
}

#[test]
fn inputs_are_truncated_to_input_precision() {
    // ap_fixed<12,12> keeps no fractional bits; -1.5 becomes -2
    let k = kernel(2, 1, &[1.0, 1.0], &[0.0]);
    let out = k.forward_f64(&[2.75, -1.5]).unwrap();
    assert_eq!(out.to_f64s(), vec![0.0]);
}

#[test]
fn evaluation_is_repeatable() {
    let k = random_kernel(7);
    let x = random_input(11, N_INPUT_1_1);
    let a = k.forward_f64(&x).unwrap();
    let b = k.forward_f64(&x).unwrap();
    assert_eq!(a, b);
}

#[test]
fn stream_and_block_transfers_match() {
    let k = random_kernel(3);
    for seed in 0..4 {
        let x = QTensor::from_f64s(k.config().precision.input, &random_input(seed, N_INPUT_1_1)).unwrap();

        let block = k.forward(&x).unwrap();

        let mut array_out = vec![Fixed::zero(k.config().precision.result); N_LAYER_2];
        let array_in: Vec<Fixed> = x.iter().collect();
        k.forward_array(&array_in, &mut array_out).unwrap();

        let mut s_in: Stream<Fixed> = x.iter().collect();
        let mut s_out = Stream::new();
        k.forward_stream(&mut s_in, &mut s_out).unwrap();
        assert!(s_in.is_empty());

        let streamed: Vec<i64> = s_out.into_iter().map(|v| v.raw()).collect();
        let arrayed: Vec<i64> = array_out.iter().map(|v| v.raw()).collect();
        assert_eq!(streamed, block.raw().to_vec());
        assert_eq!(arrayed, block.raw().to_vec());
    }
}

#[test]
fn stream_consumes_exactly_one_tensor() {
    let k = kernel(2, 1, &[1.0, 1.0], &[0.0]);
    let spec = k.config().precision.input;
    let mut s_in: Stream<Fixed> = [1.0, 2.0, 3.0, 4.0, 5.0].iter()
        .map(|&v| spec.quantize(v).unwrap())
        .collect();
    let mut s_out = Stream::new();
    k.forward_stream(&mut s_in, &mut s_out).unwrap();
    k.forward_stream(&mut s_in, &mut s_out).unwrap();
    assert_eq!(s_in.len(), 1);
    let sums: Vec<f64> = s_out.into_iter().map(|v| v.to_f64()).collect();
    assert_eq!(sums, vec![3.0, 7.0]);
}

#[test]
fn stream_underflow_leaves_input_untouched() {
    let k = kernel(4, 2, &[1.0; 8], &[0.0, 0.0]);
    let spec = k.config().precision.input;
    let mut s_in: Stream<Fixed> = (0..3).map(|v| spec.quantize(v as f64).unwrap()).collect();
    let mut s_out = Stream::new();
    let err = k.forward_stream(&mut s_in, &mut s_out).unwrap_err();
    assert!(matches!(err, DenseError::Shape(ShapeError::StreamUnderflow { expected: 4, found: 3 })));
    assert_eq!(s_in.len(), 3);
    assert!(s_out.is_empty());
}

#[test]
fn wrong_input_length_is_a_shape_error() {
    let k = kernel(4, 2, &[1.0; 8], &[0.0, 0.0]);
    let err = k.forward_f64(&[1.0, 2.0, 3.0]).unwrap_err();
    assert!(matches!(err, DenseError::Shape(ShapeError::Input { expected: 4, found: 3 })));

    let mut out = vec![Fixed::zero(k.config().precision.result); 3];
    let input: Vec<Fixed> = QTensor::zeros(k.config().precision.input, 4).iter().collect();
    let err = k.forward_array(&input, &mut out).unwrap_err();
    assert!(matches!(err, DenseError::Shape(ShapeError::Output { expected: 2, found: 3 })));
}

#[test]
fn parameter_counts_are_checked_at_build() {
    let err = DenseKernel::builder(DenseConfig::with_shape(4, 2))
        .parameters_f64(&[1.0; 7], &[0.0, 0.0])
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, DenseError::Shape(ShapeError::Weights { expected: 8, found: 7 })));

    let err = DenseKernel::builder(DenseConfig::with_shape(4, 2))
        .parameters_f64(&[1.0; 8], &[0.0])
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, DenseError::Shape(ShapeError::Biases { expected: 2, found: 1 })));

    let err = DenseKernel::builder(DenseConfig::with_shape(0, 2))
        .parameters_f64(&[], &[0.0, 0.0])
        .unwrap()
        .build()
        .unwrap_err();
    assert!(matches!(err, DenseError::Shape(ShapeError::Empty { n_in: 0, n_out: 2 })));
}

#[test]
fn in_memory_parameters_are_cast_to_layer_precision() {
    let coarse = nnet_dense::FixedSpec::new(16, 16).unwrap();
    let w = QTensor::from_f64s(coarse, &[1.0, 2.0]).unwrap();
    let b = QTensor::from_f64s(coarse, &[3.0]).unwrap();
    let k = DenseKernel::builder(DenseConfig::with_shape(2, 1)).parameters(w, b).build().unwrap();
    assert_eq!(k.weights().spec(), k.config().precision.weight);
    assert_eq!(k.biases().to_f64s(), vec![3.0]);
    assert_eq!(k.forward_f64(&[1.0, 1.0]).unwrap().to_f64s(), vec![6.0]);
}
