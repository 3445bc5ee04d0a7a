/* Fiat arithmetic where NaN stands for "value unknown" */

/* Sum that elides NaN members instead of propagating them */
pub fn nan_sum<I: IntoIterator<Item = f64>>(values: I) -> f64 {
    values.into_iter().filter(|v| !v.is_nan()).sum()
}

pub fn ratio(new: Option<f64>, last: Option<f64>) -> f64 {
    let (new, last) = match (new, last) {
        (Some(new), Some(last)) => (new, last),
        _ => return 0.0,
    };
    if last == 0.0 && new != 0.0 {
        return f64::INFINITY;
    }
    if last == 0.0 && new == 0.0 {
        return 1.0;
    }
    new / last
}

pub fn relative_delta(new: Option<f64>, last: Option<f64>) -> f64 {
    match (new, last) {
        (Some(new), Some(last)) => new - last,
        _ => 0.0,
    }
}

pub fn relative_percentage(new: Option<f64>, last: Option<f64>) -> f64 {
    100.0 * (ratio(new, last) - 1.0)
}

/* Share of `part` in `total`, as a percentage; 0 when the total is 0 */
pub fn share_percentage(part: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    100.0 * part / total
}

pub fn num_to_str(num: Option<f64>) -> String {
    match num {
        Some(num) => format!("{:.3}", num),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nan_sum_elides_nan() {
        assert_eq!(nan_sum(vec![1.0, f64::NAN, 2.5]), 3.5);
        assert_eq!(nan_sum(vec![f64::NAN]), 0.0);
        assert_eq!(nan_sum(Vec::<f64>::new()), 0.0);
    }

    #[test]
    fn test_ratio_edge_cases() {
        assert_eq!(ratio(Some(5.0), Some(0.0)), f64::INFINITY);
        assert_eq!(ratio(Some(0.0), Some(0.0)), 1.0);
        assert_eq!(ratio(None, Some(1.0)), 0.0);
        assert_eq!(ratio(Some(3.0), Some(2.0)), 1.5);
    }

    #[test]
    fn test_relative_values() {
        assert_eq!(relative_delta(Some(12500.0), Some(10000.0)), 2500.0);
        assert_eq!(relative_percentage(Some(12500.0), Some(10000.0)), 25.0);
        assert_eq!(relative_delta(Some(1.0), None), 0.0);
    }

    #[test]
    fn test_share_percentage() {
        assert_eq!(share_percentage(25.0, 100.0), 25.0);
        assert_eq!(share_percentage(25.0, 0.0), 0.0);
    }
}
