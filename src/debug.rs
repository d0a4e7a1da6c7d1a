use nalgebra::DMatrix;
use num_complex::Complex64;
use pretty_dtoa::{dtoa, FmtFloatConfig};

const FLOAT_CONFIG: FmtFloatConfig = FmtFloatConfig::default()
    .add_point_zero(false)
    .max_significant_digits(9);

pub fn format_f64_vec(v: &[f64]) -> String {
    let a: Vec<String> = v.iter().map(|f| dtoa(*f, FLOAT_CONFIG)).collect();
    format!("[{}]", a.join(", "))
}

fn format_complex(z: &Complex64) -> String {
    format!(
        "{}{}j{}",
        dtoa(z.re, FLOAT_CONFIG),
        if z.im.signum() < 0.0 { "-" } else { "+" },
        dtoa(z.im.abs(), FLOAT_CONFIG)
    )
}

pub fn format_rect_vec(v: &[Complex64]) -> String {
    let a: Vec<String> = v.iter().map(format_complex).collect();
    format!("[{}]", a.join(", "))
}

pub fn format_polar(z: &Complex64) -> String {
    format!(
        "{}\u{2220}{}\u{00B0}",
        dtoa(z.norm(), FLOAT_CONFIG),
        dtoa(z.arg().to_degrees(), FLOAT_CONFIG)
    )
}

pub fn format_polar_vec(v: &[Complex64]) -> String {
    let a: Vec<String> = v.iter().map(format_polar).collect();
    format!("[{}]", a.join(", "))
}

/// One line per row, labelled with the bus name.
pub fn format_ybus(names: &[&str], y: &DMatrix<Complex64>) -> String {
    let mut s = String::new();
    for (i, name) in names.iter().enumerate() {
        let row: Vec<Complex64> = y.row(i).iter().copied().collect();
        s.push_str(&format!("{}: {}\n", name, format_rect_vec(&row)));
    }
    s
}

pub fn format_f64_mat(m: &DMatrix<f64>) -> String {
    let mut s = String::new();
    for r in 0..m.nrows() {
        let row: Vec<f64> = m.row(r).iter().copied().collect();
        s.push_str(&format_f64_vec(&row));
        s.push('\n');
    }
    s
}
