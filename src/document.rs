//! Document-level properties: the item guid and the body language.

use serde_json::json;

use crate::dom::NodeId;
use crate::error::{Error, Result};
use crate::events::{Action, Change};
use crate::model::LanguageParts;
use crate::news_item::NewsItem;

const IDF_PATH: [&str; 3] = ["contentSet", "inlineXML", "idf"];
const LANG_ATTR: &str = "xml:lang";

/// Maps a bare language code (`sv`) to a full locale (`sv_SE`).
///
/// Supplied by the host; closures work too.
pub trait LocaleResolver {
    fn locale_for(&self, language: &str) -> Option<String>;
}

impl<F> LocaleResolver for F
where
    F: Fn(&str) -> Option<String>,
{
    fn locale_for(&self, language: &str) -> Option<String> {
        self(language)
    }
}

impl NewsItem<'_> {
    pub fn guid(&self) -> Option<String> {
        let root = self.dom().document_element()?;
        self.dom().attr(root, "guid").map(str::to_string)
    }

    /// Set the root `guid`; `None` clears it to an empty string.
    pub fn set_guid(&mut self, actor: &str, guid: Option<&str>) -> Result<()> {
        let root = self.root()?;
        let guid = guid.unwrap_or_default();
        self.dom_mut().set_attr(root, "guid", guid);
        self.emit(actor, Change::new("guid", Action::Set, json!(guid)))
    }

    fn idf(&self) -> Option<NodeId> {
        let root = self.dom().document_element()?;
        self.dom().find_one(root, &IDF_PATH, |dom, node| dom.is_element(node))
    }

    /// Language and direction of the body, split from `xml:lang="sv-SE"`.
    pub fn language_parts(&self) -> LanguageParts {
        let Some(idf) = self.idf() else {
            return LanguageParts::default();
        };
        let dom = self.dom();
        let mut parts = dom
            .attr(idf, LANG_ATTR)
            .unwrap_or_default()
            .split('-')
            .filter(|part| !part.is_empty())
            .map(str::to_string);
        LanguageParts {
            lang: parts.next(),
            region: parts.next(),
            direction: dom.attr(idf, "dir").map(str::to_string),
        }
    }

    /// Set the body language. `sv_SE` is accepted and stored as `sv-SE`; the
    /// direction defaults to the configured one.
    pub fn set_language(&mut self, actor: &str, code: &str, direction: Option<&str>) -> Result<()> {
        let code = code.replacen('_', "-", 1);
        let direction = direction
            .unwrap_or(&self.config().default_text_direction)
            .to_string();
        let idf = self
            .idf()
            .ok_or_else(|| Error::MissingElement(IDF_PATH.join(" > ")))?;

        let dom = self.dom_mut();
        dom.set_attr(idf, LANG_ATTR, code.as_str());
        dom.set_attr(idf, "dir", direction.as_str());
        self.emit(
            actor,
            Change::new(
                "language",
                Action::Update,
                json!({ "languageCode": code, "textDirection": direction }),
            ),
        )
    }

    /// Locale as `xx_YY`. Bare language codes are resolved by `resolver`.
    pub fn locale(&self, resolver: &dyn LocaleResolver) -> Option<String> {
        match self.language_parts() {
            LanguageParts {
                lang: Some(lang),
                region: Some(region),
                ..
            } => Some(format!("{lang}_{region}")),
            LanguageParts { lang: Some(lang), .. } => resolver.locale_for(&lang),
            _ => None,
        }
    }

    /// Stored `dir`, else the configured default.
    pub fn text_direction(&self) -> String {
        self.language_parts()
            .direction
            .unwrap_or_else(|| self.config().default_text_direction.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dom::XmlDom;
    use crate::events::EventLog;

    const DOC: &str = r#"<newsItem xmlns="http://iptc.org/std/nar/2006-10-01/" guid="a1">
  <itemMeta/>
  <contentSet>
    <inlineXML contenttype="application/vnd.iptc.g2.newsitem+xml">
      <idf xmlns="http://www.infomaker.se/idf/1.0" xml:lang="sv" dir="ltr"><group type="body"/></idf>
    </inlineXML>
  </contentSet>
</newsItem>"#;

    fn sv_only(language: &str) -> Option<String> {
        (language == "sv").then(|| "sv_SE".to_string())
    }

    #[test]
    fn test_guid() {
        let mut dom = XmlDom::parse(DOC).unwrap();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        assert_eq!(item.guid().as_deref(), Some("a1"));
        item.set_guid("a", Some("b2")).unwrap();
        assert_eq!(item.guid().as_deref(), Some("b2"));
        item.set_guid("a", None).unwrap();
        assert_eq!(item.guid().as_deref(), Some(""));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_language_and_locale() {
        let mut dom = XmlDom::parse(DOC).unwrap();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        let parts = item.language_parts();
        assert_eq!(parts.lang.as_deref(), Some("sv"));
        assert!(parts.region.is_none());
        assert_eq!(item.locale(&sv_only).as_deref(), Some("sv_SE"));

        item.set_language("a", "en_GB", Some("ltr")).unwrap();
        let parts = item.language_parts();
        assert_eq!(parts.lang.as_deref(), Some("en"));
        assert_eq!(parts.region.as_deref(), Some("GB"));
        assert_eq!(item.locale(&sv_only).as_deref(), Some("en_GB"));

        item.set_language("a", "ar", Some("rtl")).unwrap();
        assert_eq!(item.text_direction(), "rtl");
        assert!(item.locale(&sv_only).is_none());

        assert_eq!(log.len(), 2);
        assert_eq!(log.events()[0].change.data["languageCode"], "en-GB");
    }

    #[test]
    fn test_direction_falls_back_to_config() {
        let mut dom = XmlDom::parse(
            r#"<newsItem><contentSet><inlineXML><idf xml:lang="he"/></inlineXML></contentSet></newsItem>"#,
        )
        .unwrap();
        let mut log = EventLog::new();
        let config = Config {
            default_text_direction: "rtl".into(),
            ..Config::default()
        };
        let mut item = NewsItem::new(&mut dom, &mut log).with_config(config);

        assert_eq!(item.text_direction(), "rtl");
        item.set_language("a", "he-IL", None).unwrap();
        let idf = item.idf().unwrap();
        assert_eq!(item.dom().attr(idf, "dir"), Some("rtl"));
    }

    #[test]
    fn test_set_language_without_body_fails() {
        let mut dom = XmlDom::parse(r#"<newsItem><itemMeta/></newsItem>"#).unwrap();
        let mut log = EventLog::new();
        let mut item = NewsItem::new(&mut dom, &mut log);

        assert!(matches!(
            item.set_language("a", "sv-SE", None),
            Err(Error::MissingElement(_))
        ));
        assert_eq!(item.language_parts(), LanguageParts::default());
        assert!(log.is_empty());
    }
}
