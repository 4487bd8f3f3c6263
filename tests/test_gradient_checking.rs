// Tests for numerical gradient checking using finite differences.
// These tests verify that the analytical gradients of Linear and Conv2D (both the
// input gradient returned by backward and the parameter gradients handed to the
// optimizer by update) match central-difference approximations.

use neural_layers::functions::convolution::convolution_2d;
use neural_layers::functions::linear::linear;
use neural_layers::functions::{Conv2dParams, Function, ReLU, Sigmoid};
use neural_layers::initializers::{Initializer, LeCunNormal};
use neural_layers::layers::{Conv2D, Linear};
use neural_layers::utils::{numerical_gradient, relative_error};
use neural_layers::Tensor;
use std::cell::RefCell;
use std::rc::Rc;

const EPS: f32 = 1e-2;
const TOLERANCE: f32 = 1e-2;

fn random(shape: &[usize], seed: u64) -> Tensor {
    LeCunNormal::seeded(seed).initialize(shape)
}

/// Optimizer that records every gradient it receives and leaves the parameter unchanged.
fn recorder() -> (Rc<RefCell<Vec<Tensor>>>, impl FnMut(&mut Tensor, &Tensor) + Clone) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let rule = move |_: &mut Tensor, g: &Tensor| sink.borrow_mut().push(g.clone());
    (seen, rule)
}

/// Input gradient of `Σ (f(x) ⊙ r)` for a function under test, compared to `backward(r)`.
fn check_input_gradient<F: Function>(function: &mut F, x: &Tensor, r: &Tensor) {
    let numeric = numerical_gradient(x, EPS, |t| {
        let y = function.forward(t).expect("forward failed");
        function.clear_cache();
        (y * r).sum()
    });

    function.forward(x).expect("forward failed");
    let analytic = function.backward(r).expect("backward failed");

    let err = relative_error(&analytic, &numeric);
    assert!(err < TOLERANCE, "input gradient relative error {}", err);
}

// ============================================================================
// Linear
// ============================================================================

#[test]
fn test_linear_input_gradient() {
    let (_, rule) = recorder();
    let mut layer =
        Linear::with_initializer(5, 3, &rule, &mut LeCunNormal::seeded(1)).unwrap();
    let x = random(&[4, 5], 2);
    let r = random(&[4, 3], 3);

    check_input_gradient(&mut layer, &x, &r);
}

#[test]
fn test_linear_parameter_gradients() {
    let (seen, rule) = recorder();
    let mut layer =
        Linear::with_initializer(5, 3, &rule, &mut LeCunNormal::seeded(1)).unwrap();
    let x = random(&[4, 5], 2);
    let r = random(&[4, 3], 3);

    layer.forward(&x).unwrap();
    layer.backward(&r).unwrap();
    layer.update().unwrap();

    let grads = seen.borrow();
    assert_eq!(grads.len(), 2);

    let w = layer.weight().clone();
    let b = layer.bias().clone();
    let numeric_w = numerical_gradient(&w, EPS, |t| (linear(&x, t, &b).unwrap() * &r).sum());
    let numeric_b = numerical_gradient(&b, EPS, |t| (linear(&x, &w, t).unwrap() * &r).sum());

    assert!(relative_error(&grads[0], &numeric_w) < TOLERANCE);
    assert!(relative_error(&grads[1], &numeric_b) < TOLERANCE);
}

// ============================================================================
// Conv2D
// ============================================================================

fn conv_layer(params: Conv2dParams, rule: &dyn neural_layers::optimizers::Optimizer) -> Conv2D {
    Conv2D::with_params(4, params, rule)
        .unwrap()
        .with_initializer(LeCunNormal::seeded(5))
}

#[test]
fn test_conv2d_input_gradient_same_padding() {
    let (_, rule) = recorder();
    let mut layer = conv_layer(Conv2dParams::square(3, 1, 1).unwrap(), &rule);
    let x = random(&[2, 2, 5, 5], 6);
    let r = random(&[2, 4, 5, 5], 7);

    check_input_gradient(&mut layer, &x, &r);
}

#[test]
fn test_conv2d_input_gradient_strided_rectangular() {
    let (_, rule) = recorder();
    let params = Conv2dParams::new((3, 2), (2, 1), (1, 0), false).unwrap();
    let mut layer = conv_layer(params, &rule);
    let x = random(&[2, 3, 7, 7], 8);
    // out_h = (7 + 2 - 3) / 2 + 1 = 4, out_w = 7 - 2 + 1 = 6
    let r = random(&[2, 4, 4, 6], 9);

    check_input_gradient(&mut layer, &x, &r);
}

#[test]
fn test_conv2d_input_gradient_cover_all() {
    let (_, rule) = recorder();
    let params = Conv2dParams::new((3, 3), (2, 2), (1, 1), true).unwrap();
    let mut layer = conv_layer(params, &rule);
    let x = random(&[1, 2, 8, 8], 10);
    // cover_all: (8 + 2 - 3 + 1) / 2 + 1 = 5
    let r = random(&[1, 4, 5, 5], 11);

    check_input_gradient(&mut layer, &x, &r);
}

#[test]
fn test_conv2d_filter_gradient() {
    let (seen, rule) = recorder();
    let params = Conv2dParams::new((3, 3), (2, 2), (1, 1), false).unwrap();
    let mut layer = conv_layer(params, &rule);
    let x = random(&[2, 2, 6, 6], 12);
    let r = random(&[2, 4, 3, 3], 13);

    layer.forward(&x).unwrap();
    layer.backward(&r).unwrap();
    layer.update().unwrap();

    let grads = seen.borrow();
    assert_eq!(grads.len(), 1);

    let w = layer.weight().unwrap().clone();
    let numeric = numerical_gradient(&w, EPS, |t| {
        (convolution_2d(&x, t, &params).unwrap() * &r).sum()
    });
    let err = relative_error(&grads[0], &numeric);
    assert!(err < TOLERANCE, "filter gradient relative error {}", err);
}

// ============================================================================
// Activations
// ============================================================================

#[test]
fn test_sigmoid_input_gradient() {
    let mut sigmoid = Sigmoid::new();
    let x = random(&[3, 4], 14);
    let r = random(&[3, 4], 15);

    check_input_gradient(&mut sigmoid, &x, &r);
}

#[test]
fn test_relu_input_gradient_away_from_kink() {
    let mut relu = ReLU::new();
    // keep every element at least 0.1 from zero so ±EPS never crosses the kink
    let x = random(&[3, 4], 16).mapv(|v| if v >= 0.0 { v + 0.1 } else { v - 0.1 });
    let r = random(&[3, 4], 17);

    check_input_gradient(&mut relu, &x, &r);
}
