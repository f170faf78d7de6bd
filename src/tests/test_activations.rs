use ndarray::array;
use crate::activations::Activation;
use crate::error::DuelError;

#[test]
fn test_relu_activation() {
    let relu = Activation::Relu;
    let mut input = array![-1.0, 0.0, 1.0, 2.0];
    relu.apply(&mut input);
    assert_eq!(input, array![0.0, 0.0, 1.0, 2.0]);
}

#[test]
fn test_tanh_activation() {
    let tanh = Activation::Tanh;
    let mut input = array![0.0, 1.0];
    tanh.apply(&mut input);
    assert_eq!(input[0], 0.0);
    assert!((input[1] - 0.761_594).abs() < 1e-5);
}

#[test]
fn test_linear_is_identity() {
    let mut input = array![[-3.0, 0.5], [2.0, 7.0]];
    let expected = input.clone();
    Activation::Linear.apply(&mut input);
    assert_eq!(input, expected);
}

#[test]
fn test_relu_derivative() {
    let pre = array![-2.0, 0.0, 3.0];
    assert_eq!(Activation::Relu.derivative(pre.view()), array![0.0, 0.0, 1.0]);
}

#[test]
fn test_tanh_derivative() {
    let pre = array![0.0, 0.5];
    let d = Activation::Tanh.derivative(pre.view());
    assert!((d[0] - 1.0).abs() < 1e-6);
    let t = 0.5f32.tanh();
    assert!((d[1] - (1.0 - t * t)).abs() < 1e-6);
}

#[test]
fn test_linear_derivative_is_one() {
    let pre = array![[-1.0, 4.0]];
    assert_eq!(Activation::Linear.derivative(pre.view()), array![[1.0, 1.0]]);
}

#[test]
fn test_parse_activation_names() {
    assert_eq!("relu".parse::<Activation>().unwrap(), Activation::Relu);
    assert_eq!("tanh".parse::<Activation>().unwrap(), Activation::Tanh);
    assert_eq!(Activation::Tanh.to_string(), "tanh");
}

#[test]
fn test_unknown_activation_rejected() {
    for name in ["sigmoid", "linear", "RELU", ""] {
        match name.parse::<Activation>() {
            Err(DuelError::InvalidConfiguration { name, .. }) => assert_eq!(name, "activation"),
            other => panic!("expected InvalidConfiguration, got {:?}", other),
        }
    }
}
