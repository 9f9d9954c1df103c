//! Translation of SharePoint web links into UNC paths on the file share that
//! mirrors the document library.

/// Maps links under `web_prefix` to paths under `unc_prefix`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkTranslator {
    web_prefix: String,
    unc_prefix: String,
}

impl LinkTranslator {
    /// `web_prefix` is the library root as it appears in links (URL encoded),
    /// `unc_prefix` the matching share root, e.g. `\\fileserver\transcripts$\`.
    pub fn new<W: Into<String>, U: Into<String>>(web_prefix: W, unc_prefix: U) -> LinkTranslator {
        LinkTranslator {
            web_prefix: web_prefix.into(),
            unc_prefix: unc_prefix.into(),
        }
    }

    /// Converts `web_url` into a network path. Never fails: a link outside of
    /// `web_prefix` keeps its full text and is still placed under `unc_prefix`.
    /// No filesystem access happens.
    pub fn to_network_path(&self, web_url: &str) -> String {
        let relative = web_url.strip_prefix(self.web_prefix.as_str()).unwrap_or(web_url);
        let relative = relative.replace("%20", " ").replace('/', "\\");
        format!("{}{}", self.unc_prefix, relative)
    }
}
