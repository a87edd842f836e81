pub fn humanize_byte_size(size: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    if size < 1000 {
        return format!("{}{}", size, UNITS[0]);
    }

    let size = size as f64;
    let e = ((size.log10() / 3.0).floor() as i32).min((UNITS.len() - 1) as i32);
    format!("{:.3}{}", size / 1000_f64.powi(e), UNITS[e as usize])
}
