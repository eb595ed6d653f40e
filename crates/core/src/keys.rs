/// Map a logical key name ("1", "f5", "space", ...) to a Windows virtual-key code.
///
/// Names are case-insensitive. Single letters and digits map to their ASCII
/// uppercase code, the same way the virtual-key table lays them out.
pub fn virtual_key(name: &str) -> Option<u16> {
    let key = name.trim().to_lowercase();
    if key.len() == 1 {
        let c = key.chars().next()?;
        if c.is_ascii_alphanumeric() {
            return Some(c.to_ascii_uppercase() as u16);
        }
    }

    let code = match key.as_str() {
        "space" => 0x20,
        "enter" | "return" => 0x0D,
        "tab" => 0x09,
        "esc" | "escape" => 0x1B,
        "backspace" => 0x08,
        "delete" | "del" => 0x2E,
        "insert" | "ins" => 0x2D,
        "home" => 0x24,
        "end" => 0x23,
        "pageup" => 0x21,
        "pagedown" => 0x22,
        "left" => 0x25,
        "up" => 0x26,
        "right" => 0x27,
        "down" => 0x28,
        _ => return function_key(&key),
    };
    Some(code)
}

fn function_key(key: &str) -> Option<u16> {
    let n: u16 = key.strip_prefix('f')?.parse().ok()?;
    (1..=12).contains(&n).then(|| 0x70 + n - 1)
}
