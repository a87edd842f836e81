use chrono::NaiveTime;
use handlebars::Handlebars;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use url::Url;

use crate::config::{Channel, EpisodeText};
use crate::episode::Episode;
use crate::error::Result;
use crate::library::{FileSize, Library};

const FEED_TEMPLATE_NAME: &str = "feed";
const FEED_TEMPLATE: &str = include_str!("../templates/feed.xml.hbs");

/// Characters that cannot appear raw in a URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b':')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Enclosure length used when the file size cannot be read.
pub const UNKNOWN_LENGTH: u64 = 0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FeedItem {
    pub title: String,
    pub description: String,
    pub pub_date: String,
    pub enclosure_url: String,
    pub length: u64,
    pub guid: String,
    pub duration: String,
}

#[derive(Serialize)]
struct FeedDocument<'a> {
    channel: &'a Channel,
    items: &'a [FeedItem],
}

pub fn project_item(episode: &Episode, length: u64, base_url: &Url, text: &EpisodeText) -> FeedItem {
    let published = episode.date.and_time(NaiveTime::MIN).and_utc();

    FeedItem {
        title: format!("{} {}", text.title_prefix, episode.date.format("%-d %b %Y")),
        description: text.description.clone(),
        pub_date: published.format("%a, %d %b %Y %H:%M:%S %z").to_string(),
        enclosure_url: format!(
            "{}{}",
            base_url.as_str(),
            utf8_percent_encode(&episode.file_name, PATH_SEGMENT)
        ),
        length,
        guid: episode.date_key.clone(),
        duration: text.duration.clone(),
    }
}

/// Projects the library's current episodes, newest first. Episodes whose file
/// vanished since listing are left out.
pub fn project_items(library: &Library, base_url: &Url, text: &EpisodeText) -> Result<Vec<FeedItem>> {
    let episodes = library.episodes()?;
    if episodes.is_empty() {
        tracing::warn!(content_dir = %library.content_dir().display(), "no episodes found");
    }

    Ok(episodes
        .iter()
        .filter_map(|episode| {
            let length = match library.file_size(&episode.file_name) {
                FileSize::Known(length) => length,
                FileSize::Unknown => UNKNOWN_LENGTH,
                FileSize::Gone => {
                    tracing::info!(file = %episode.file_name, "episode no longer available, skipping");
                    return None;
                }
            };
            Some(project_item(episode, length, base_url, text))
        })
        .collect())
}

pub struct FeedRenderer {
    handlebars: Handlebars<'static>,
}

impl FeedRenderer {
    pub fn new() -> Result<Self> {
        let mut handlebars = Handlebars::new();
        handlebars.register_escape_fn(|s: &str| quick_xml::escape::escape(s).into_owned());
        register_handlebars_helpers(&mut handlebars);
        handlebars
            .register_template_string(FEED_TEMPLATE_NAME, FEED_TEMPLATE)
            .map_err(Box::new)?;
        Ok(FeedRenderer { handlebars })
    }

    /// Renders the whole document in memory.
    pub fn render(&self, channel: &Channel, items: &[FeedItem]) -> Result<String> {
        let document = FeedDocument { channel, items };
        Ok(self.handlebars.render(FEED_TEMPLATE_NAME, &document)?)
    }
}

fn register_handlebars_helpers(handlebars: &mut Handlebars) {
    use self::handlebars_helpers::*;

    handlebars.register_helper("yes_no", Box::new(yes_no_helper));
}

#[allow(clippy::redundant_closure)]
mod handlebars_helpers {
    use handlebars::handlebars_helper;

    handlebars_helper!(yes_no_helper: |flag: bool| if flag { "yes" } else { "no" });
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use quick_xml::events::Event;
    use quick_xml::Reader;

    use super::*;

    fn channel(title: &str) -> Channel {
        Channel {
            title: title.to_owned(),
            link: "https://example.com".to_owned(),
            language: "en-za".to_owned(),
            description: "Daily news".to_owned(),
            author: "Newsroom".to_owned(),
            owner_name: None,
            owner_email: None,
            image_url: "https://example.com/icon.jpg".to_owned(),
            category: "News".to_owned(),
            explicit: false,
        }
    }

    fn text() -> EpisodeText {
        EpisodeText {
            title_prefix: "SA News for".to_owned(),
            description: "Your daily update.".to_owned(),
            duration: "00:05:00".to_owned(),
        }
    }

    fn base_url() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    /// Parses the whole document and returns the number of `<item>` elements.
    fn count_items(xml: &str) -> usize {
        let mut reader = Reader::from_str(xml);
        let mut items = 0;
        loop {
            match reader.read_event().expect("feed must be well-formed XML") {
                Event::Start(e) if e.name().as_ref() == b"item" => items += 1,
                Event::Eof => break,
                _ => {}
            }
        }
        items
    }

    #[test]
    fn project_item_formats_fields() {
        let episode = Episode::from_file_name("2025-02-05.mp3").unwrap();
        let item = project_item(&episode, 4321, &base_url(), &text());

        assert_eq!(item.title, "SA News for 5 Feb 2025");
        assert_eq!(item.description, "Your daily update.");
        assert_eq!(item.pub_date, "Wed, 05 Feb 2025 00:00:00 +0000");
        assert_eq!(item.enclosure_url, "https://example.com/2025-02-05.mp3");
        assert_eq!(item.length, 4321);
        assert_eq!(item.guid, "2025-02-05");
        assert_eq!(item.duration, "00:05:00");
    }

    #[test]
    fn enclosure_url_encodes_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 2, 5).unwrap();
        let episode = Episode::new("morning #1: news?.mp3".to_owned(), date);
        let base = Url::parse("https://cdn.example.com/audio/").unwrap();
        let item = project_item(&episode, 0, &base, &text());
        assert_eq!(
            item.enclosure_url,
            "https://cdn.example.com/audio/morning%20%231%3A%20news%3F.mp3"
        );
    }

    #[test]
    fn empty_feed_is_valid_xml() {
        let renderer = FeedRenderer::new().unwrap();
        let xml = renderer.render(&channel("Daily"), &[]).unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<channel>"));
        assert!(xml.contains("<itunes:explicit>no</itunes:explicit>"));
        assert_eq!(count_items(&xml), 0);
    }

    #[test]
    fn free_text_is_escaped() {
        let renderer = FeedRenderer::new().unwrap();
        let mut channel = channel("Mail & Guardian <Daily>");
        channel.owner_name = Some("News & Co".to_owned());
        channel.owner_email = Some("owner@example.com".to_owned());
        let mut text = text();
        text.title_prefix = "Q&A".to_owned();

        let episode = Episode::from_file_name("2025-02-05.mp3").unwrap();
        let item = project_item(&episode, 1, &base_url(), &text);
        let xml = renderer.render(&channel, &[item]).unwrap();

        assert!(xml.contains("<title>Mail &amp; Guardian &lt;Daily&gt;</title>"));
        assert!(xml.contains("<itunes:name>News &amp; Co</itunes:name>"));
        assert!(xml.contains("<title>Q&amp;A 5 Feb 2025</title>"));
        assert!(!xml.contains("Mail & Guardian"));
        assert_eq!(count_items(&xml), 1);
    }

    #[test]
    fn owner_name_defaults_to_author() {
        let renderer = FeedRenderer::new().unwrap();
        let mut channel = channel("Daily");
        channel.owner_email = Some("owner@example.com".to_owned());

        let xml = renderer.render(&channel, &[]).unwrap();

        assert!(xml.contains("<itunes:name>Newsroom</itunes:name>"));
        assert!(xml.contains("<itunes:email>owner@example.com</itunes:email>"));
        assert_eq!(count_items(&xml), 0);
    }

    #[test]
    fn items_render_in_given_order_with_enclosures() {
        let renderer = FeedRenderer::new().unwrap();
        let items: Vec<FeedItem> = ["2025-02-15.mp3", "2025-01-01.mp3"]
            .iter()
            .map(|name| {
                let episode = Episode::from_file_name(name).unwrap();
                project_item(&episode, 10, &base_url(), &text())
            })
            .collect();

        let xml = renderer.render(&channel("Daily"), &items).unwrap();

        assert_eq!(count_items(&xml), 2);
        let newer = xml.find("<guid isPermaLink=\"false\">2025-02-15</guid>").unwrap();
        let older = xml.find("<guid isPermaLink=\"false\">2025-01-01</guid>").unwrap();
        assert!(newer < older);
        assert!(xml.contains(
            "<enclosure url=\"https://example.com/2025-02-15.mp3\" type=\"audio/mpeg\" length=\"10\"/>"
        ));
    }
}
