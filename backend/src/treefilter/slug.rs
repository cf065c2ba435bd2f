/// Turns a page title into a URL path fragment with a leading `/`.
///
/// The `---` substitution is a single pass over the string, so longer dash
/// runs are only partially collapsed. Existing links depend on this.
pub fn slug(title: &str) -> String {
    let fragment = title
        .to_lowercase()
        .replace(['(', ')'], "")
        .replace(' ', "-")
        .replace('&', "-")
        .replace("---", "-")
        .replace('.', "-")
        .replace('/', "-");
    format!("/{fragment}")
}

#[cfg(test)]
mod tests {
    use super::slug;

    #[test]
    fn plain_titles() {
        assert_eq!(slug("Getting Started"), "/getting-started");
        assert_eq!(slug(""), "/");
    }

    #[test]
    fn ampersand_between_spaces_collapses() {
        assert_eq!(slug("A & B (C)"), "/a-b-c");
        assert_eq!(slug("Q&A (Help)"), "/q-a-help");
    }

    #[test]
    fn dots_and_slashes_become_dashes() {
        assert_eq!(slug("Section 2.1/Intro"), "/section-2-1-intro");
    }

    #[test]
    fn dash_runs_collapse_only_once() {
        assert_eq!(slug("a ---- b"), "/a--b");
        assert_eq!(slug("x - y"), "/x-y");
        assert_eq!(slug("x . y"), "/x---y");
    }
}
