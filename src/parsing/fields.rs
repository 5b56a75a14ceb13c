use once_cell::sync::Lazy;
use regex::Regex;

use super::cities;

static TITLE_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:^|[^a-z])(?:tour|live|concert|one[\- ]?man)(?:[^a-z]|$)|ツアー|ライブ|ライヴ|コンサート|ワンマン",
    )
    .expect("valid title keyword regex")
});

static VENUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        (?: [^\s:：、,，/／「」()（）]* | (?:[a-z0-9.'&\-]+\s)*[a-z0-9.'&\-]* )
        (?:
            ホール | ドーム | アリーナ | シアター | 劇場 | 会館 | 体育館 | スタジアム
          | センター | ライブハウス
          | (?:hall | dome | arena | theater | theatre | stadium | center | centre | live\s?house)\b
        )",
    )
    .expect("valid venue regex")
});

static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[¥￥]\s*([0-9]{1,3}(?:[,，][0-9]{3})+|[0-9]+)|([0-9]{1,3}(?:[,，][0-9]{3})+|[0-9]+)\s*円")
        .expect("valid price regex")
});

/// First line naming a tour/live/concert, else the first line.
pub fn extract_title(lines: &[&str]) -> String {
    lines
        .iter()
        .find(|line| TITLE_KEYWORD_RE.is_match(line))
        .or_else(|| lines.first())
        .map(|line| line.to_string())
        .unwrap_or_default()
}

/// The venue name (matched text, not the whole line) from the first line
/// carrying a venue suffix.
pub fn extract_venue(lines: &[&str]) -> String {
    lines
        .iter()
        .find_map(|line| venue_in_line(line))
        .unwrap_or_default()
}

pub fn venue_in_line(line: &str) -> Option<String> {
    VENUE_RE
        .find(line)
        .map(|m| m.as_str().trim().to_string())
        .filter(|venue| !venue.is_empty())
}

/// Looks at the whole text, not line by line; see `cities::CITY_TABLE`.
pub fn extract_city(text: &str) -> String {
    cities::match_city(text).unwrap_or_default().to_string()
}

pub fn extract_price(text: &str) -> Option<u64> {
    let caps = PRICE_RE.captures(text)?;
    let amount = caps.get(1).or_else(|| caps.get(2))?;
    let digits: String = amount
        .as_str()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u64>().ok().filter(|value| *value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_prefers_keyword_line() {
        let lines = ["【お知らせ】", "Aimer Hall Tour 2026 \"Sunbeam\"", "開催決定！"];
        assert_eq!(extract_title(&lines), "Aimer Hall Tour 2026 \"Sunbeam\"");

        let lines = ["新しいお知らせ", "全国ツアー開催決定"];
        assert_eq!(extract_title(&lines), "全国ツアー開催決定");
    }

    #[test]
    fn title_keywords_need_word_edges() {
        let lines = ["Olive delivery news", "Aimer LIVE2026", "詳細"];
        assert_eq!(extract_title(&lines), "Aimer LIVE2026");
        assert_eq!(extract_title(&["Oliveの新曲", "リリース情報"]), "Oliveの新曲");
        assert_eq!(extract_title(&["出演者発表", "Aimer TOURツアー"]), "Aimer TOURツアー");
    }

    #[test]
    fn title_falls_back_to_first_line() {
        assert_eq!(extract_title(&["春の祭典", "詳細は後日"]), "春の祭典");
        assert_eq!(extract_title(&[]), "");
    }

    #[test]
    fn venue_takes_the_matched_name() {
        let lines = ["日程：2026/3/5", "会場：東京ガーデンシアター（東京都江東区）"];
        assert_eq!(extract_venue(&lines), "東京ガーデンシアター");
        assert_eq!(extract_venue(&["会場 大阪城ホール"]), "大阪城ホール");
        assert_eq!(extract_venue(&["@ Zepp Nagoya / 日本ガイシホール"]), "日本ガイシホール");
    }

    #[test]
    fn venue_handles_latin_names() {
        assert_eq!(
            extract_venue(&["Venue: Tokyo Garden Theater"]),
            "Tokyo Garden Theater"
        );
        assert_eq!(extract_venue(&["Challenge accepted"]), "");
    }

    #[test]
    fn missing_venue_is_empty() {
        assert_eq!(extract_venue(&["詳細は後日発表"]), "");
    }

    #[test]
    fn city_comes_from_whole_text() {
        assert_eq!(extract_city("会場：大阪城ホール\n東京公演は追加予定"), "東京");
        assert_eq!(extract_city("配信のみ"), "");
    }

    #[test]
    fn price_patterns() {
        assert_eq!(extract_price("チケット ¥8,800（税込）"), Some(8800));
        assert_eq!(extract_price("全席指定 3,500円"), Some(3500));
        assert_eq!(extract_price("￥12000"), Some(12000));
        assert_eq!(extract_price("前売 6000円 / 当日 6500円"), Some(6000));
        assert_eq!(extract_price("価格未定"), None);
        assert_eq!(extract_price("¥0"), None);
        assert_eq!(extract_price("¥5,000,000,000"), Some(5_000_000_000));
    }
}
