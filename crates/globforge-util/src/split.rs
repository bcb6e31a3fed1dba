/// Split `input` on `separator`, dropping empty pieces.
///
/// # Example
///
/// ```
/// use globforge_util::split::split_filter_empty;
/// let parts: Vec<_> = split_filter_empty("/a//b/c/", "/").collect();
/// assert_eq!(parts, vec!["a", "b", "c"]);
/// ```
pub fn split_filter_empty<'a>(input: &'a str, separator: &'a str) -> impl Iterator<Item = &'a str> {
    input.split(separator).filter(|v| !v.is_empty())
}
