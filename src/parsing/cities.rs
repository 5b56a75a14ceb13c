/// A city the extractor recognises. Lower `priority` wins when an
/// announcement names several cities, whatever their order in the text.
#[derive(Debug, Clone, Copy)]
pub struct CityRule {
    pub priority: u8,
    pub name: &'static str,
}

const fn city(priority: u8, name: &'static str) -> CityRule {
    CityRule { priority, name }
}

/// Major tour cities. `東京` must stay ahead of `京都` because `東京都`
/// contains `京都`.
pub const CITY_TABLE: &[CityRule] = &[
    city(0, "東京"),
    city(1, "大阪"),
    city(2, "名古屋"),
    city(3, "福岡"),
    city(4, "札幌"),
    city(5, "横浜"),
    city(6, "仙台"),
    city(7, "広島"),
    city(8, "神戸"),
    city(9, "京都"),
    city(10, "さいたま"),
    city(11, "千葉"),
    city(12, "川崎"),
    city(13, "新潟"),
    city(14, "静岡"),
    city(15, "浜松"),
    city(16, "金沢"),
    city(17, "岡山"),
    city(18, "高松"),
    city(19, "松山"),
    city(20, "熊本"),
    city(21, "鹿児島"),
    city(22, "那覇"),
    city(23, "長野"),
    city(24, "宇都宮"),
    city(25, "高崎"),
    city(26, "郡山"),
    city(27, "北九州"),
    city(28, "長崎"),
];

/// First city of the table (by priority) that occurs anywhere in `text`.
pub fn match_city(text: &str) -> Option<&'static str> {
    CITY_TABLE
        .iter()
        .filter(|rule| text.contains(rule.name))
        .min_by_key(|rule| rule.priority)
        .map(|rule| rule.name)
}
