use crate::dao::HistoryEntry;
use crate::downloads::DownloadMeta;
use crate::types::{MediaDetail, Source};

fn non_empty(s: &str) -> Option<String> {
    Some(s.to_string()).filter(|v| !v.is_empty())
}

pub fn download_meta_from_detail(d: &MediaDetail) -> DownloadMeta {
    DownloadMeta { id: d.id.clone(), title: non_empty(&d.title), poster: non_empty(&d.poster) }
}

/// History is keyed by id: the subject's own, else the id it was requested under. `None`
/// only when both are empty.
pub fn history_entry_from_detail(d: &MediaDetail, requested_id: &str) -> Option<HistoryEntry> {
    let id = d.id.as_deref().and_then(non_empty).or_else(|| non_empty(requested_id))?;
    let title = non_empty(&d.title).unwrap_or_else(|| "Untitled".to_string());
    Some(HistoryEntry { id, title, poster: d.poster.clone() })
}

/// The URL a player or downloader should open: `url`, else `download_url`.
pub fn playback_url(source: &Source) -> Option<&str> {
    [source.url.as_str(), source.download_url.as_str()].into_iter().find(|u| !u.is_empty())
}

/// Prefer an HLS playlist; otherwise take the first source.
pub fn pick_stream(sources: &[Source]) -> Option<&Source> {
    sources.iter().find(|s| s.url.contains(".m3u8")).or_else(|| sources.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(url: &str, download_url: &str) -> Source {
        Source { url: url.into(), download_url: download_url.into(), extra: Default::default() }
    }

    #[test]
    fn hls_wins_over_earlier_files() {
        let sources = vec![source("https://cdn/a.mp4", ""), source("https://cdn/b.m3u8", ""), source("https://cdn/c.m3u8", "")];
        assert_eq!(pick_stream(&sources).map(|s| s.url.as_str()), Some("https://cdn/b.m3u8"));
    }

    #[test]
    fn falls_back_to_first_source() {
        let sources = vec![source("", "https://cdn/a.mp4?download=1"), source("https://cdn/b.mp4", "")];
        let chosen = pick_stream(&sources).unwrap();
        assert_eq!(playback_url(chosen), Some("https://cdn/a.mp4?download=1"));
        assert!(pick_stream(&[]).is_none());
        assert_eq!(playback_url(&source("", "")), None);
    }

    #[test]
    fn history_id_falls_back_to_requested_id() {
        let mut d = MediaDetail { title: "Dune".into(), poster: "p.jpg".into(), ..Default::default() };
        assert_eq!(history_entry_from_detail(&d, ""), None);
        assert_eq!(history_entry_from_detail(&d, "77").map(|e| e.id), Some("77".to_string()));
        d.id = Some(String::new());
        assert_eq!(history_entry_from_detail(&d, "77").map(|e| e.id), Some("77".to_string()));
        d.id = Some("42".into());
        assert_eq!(
            history_entry_from_detail(&d, "77"),
            Some(HistoryEntry { id: "42".into(), title: "Dune".into(), poster: "p.jpg".into() })
        );
    }

    #[test]
    fn missing_title_is_untitled() {
        let d = MediaDetail { id: Some("9".into()), ..Default::default() };
        let entry = history_entry_from_detail(&d, "9").unwrap();
        assert_eq!(entry.title, "Untitled");
        assert_eq!(entry.poster, "");
    }

    #[test]
    fn empty_detail_fields_become_none() {
        let meta = download_meta_from_detail(&MediaDetail::default());
        assert_eq!(meta, DownloadMeta::default());
    }
}
