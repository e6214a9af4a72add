use std::collections::HashSet;

/// Turns user-typed text into the content stored on a pending comment
pub trait Sanitizer {
    fn sanitize(&self, text: &str) -> String;
}

impl<F: Fn(&str) -> String> Sanitizer for F {
    fn sanitize(&self, text: &str) -> String {
        self(text)
    }
}

/// Removes every HTML tag, keeping the text in between. Script and style
/// elements are dropped along with their content.
///
/// The output is HTML-escaped: `Tom & Jerry` comes out as `Tom &amp; Jerry`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StripHtml;

impl Sanitizer for StripHtml {
    fn sanitize(&self, text: &str) -> String {
        ammonia::Builder::empty()
            .clean_content_tags(HashSet::from(["script", "style"]))
            .clean(text)
            .to_string()
    }
}
