use ndarray::Array2;

// The quadratic cost is C = ½‖desired - output‖². Backpropagation only ever needs its derivative
// with respect to the output activations, which is simply the difference between the two.
pub fn quadratic_cost_derivative(output: &Array2<f64>, desired: &Array2<f64>) -> Array2<f64> {
    output - desired
}

// The scalar value of the quadratic cost, used for reporting how well the network fits some data.
pub fn quadratic_cost(output: &Array2<f64>, desired: &Array2<f64>) -> f64 {
    0.5 * (output - desired).mapv(|d| d * d).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn derivative_is_output_minus_desired() {
        let output = array![[0.25, 0.75, 1.0]];
        let desired = array![[0.0, 1.0, 1.0]];
        assert_eq!(
            quadratic_cost_derivative(&output, &desired),
            array![[0.25, -0.25, 0.0]]
        );
    }

    #[test]
    fn cost_is_half_squared_distance() {
        let output = array![[1.0, 2.0]];
        let desired = array![[0.0, 0.0]];
        assert_abs_diff_eq!(quadratic_cost(&output, &desired), 2.5);
        assert_abs_diff_eq!(quadratic_cost(&desired, &desired), 0.0);
    }
}
