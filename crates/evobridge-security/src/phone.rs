/// Reduce a phone number or WhatsApp JID to its bare digits.
///
/// `+962787499976`, `962787499976@s.whatsapp.net` and `962787499976` all
/// normalize to `962787499976`. Every `+` is dropped and anything from the
/// first `@` onwards is cut.
pub fn normalize_phone(raw: &str) -> String {
    let without_plus = raw.replace('+', "");
    match without_plus.split_once('@') {
        Some((number, _domain)) => number.to_string(),
        None => without_plus,
    }
}
