/// Encode credentials as a `Basic` authorization value.
pub(crate) fn basic_auth<U, P>(username: U, password: Option<P>) -> String
where
    U: std::fmt::Display,
    P: std::fmt::Display,
{
    use base64::prelude::BASE64_STANDARD;
    use base64::write::EncoderStringWriter;
    use std::io::Write;

    let mut encoder = EncoderStringWriter::from_consumer(String::from("Basic "), &BASE64_STANDARD);
    let _ = write!(encoder, "{username}:");
    if let Some(password) = password {
        let _ = write!(encoder, "{password}");
    }
    encoder.into_inner()
}
