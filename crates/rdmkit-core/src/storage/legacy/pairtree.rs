/// Split a zero-padded record id into two-character directory segments:
/// `123` becomes `00/00/01/23`.
pub fn pairtree(id: i64) -> String {
    let padded = format!("{id:08}");
    padded
        .as_bytes()
        .chunks(2)
        .map(|c| String::from_utf8_lossy(c).to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Storage directory value written to `eprint.dir`.
pub fn dir_value(id: i64) -> String {
    format!("disk0/{}", pairtree(id))
}
