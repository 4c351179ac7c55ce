//! Series and franchise detection.
//!
//! Tracks from the same anime, game or VTuber franchise rarely share audio
//! features or tags in a useful way, so titles are matched against a closed
//! keyword table instead.

/// A franchise and the title keywords identifying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Franchise {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

/// Bonus applied when seed and candidate belong to the same franchise.
pub const FRANCHISE_BONUS: f64 = 2.0;

/// Keywords are lowercase; matching lowercases the title first.
pub const FRANCHISES: &[Franchise] = &[
    Franchise {
        name: "Love Live",
        keywords: &["ラブライブ", "love live", "lovelive"],
    },
    Franchise {
        name: "THE IDOLM@STER",
        keywords: &[
            "アイマス",
            "idolm@ster",
            "アイドルマスター",
            "cinderella girls",
            "シンデレラガールズ",
            "million live",
            "ミリオンライブ",
            "shiny colors",
            "シャニマス",
        ],
    },
    Franchise {
        name: "BanG Dream",
        keywords: &[
            "バンドリ",
            "bang dream",
            "bandori",
            "poppin'party",
            "roselia",
            "raise a suilen",
            "morfonica",
        ],
    },
    Franchise {
        name: "Project Sekai",
        keywords: &["プロセカ", "project sekai", "プロジェクトセカイ"],
    },
    Franchise {
        name: "Uma Musume",
        keywords: &["ウマ娘", "uma musume", "うまむすめ"],
    },
    Franchise {
        name: "hololive",
        keywords: &["hololive", "ホロライブ"],
    },
    Franchise {
        name: "Nijisanji",
        keywords: &["にじさんじ", "nijisanji"],
    },
    Franchise {
        name: "VTuber",
        keywords: &["vtuber", "ブイチューバー"],
    },
    Franchise {
        name: "Fate",
        keywords: &["fate/", "fgo", "フェイト"],
    },
    Franchise {
        name: "Touhou",
        keywords: &["touhou", "東方", "幻想郷"],
    },
    Franchise {
        name: "Vocaloid",
        keywords: &[
            "vocaloid",
            "ボカロ",
            "初音ミク",
            "hatsune miku",
            "鏡音リン",
            "鏡音レン",
            "巡音ルカ",
        ],
    },
    Franchise {
        name: "K-ON!",
        keywords: &["けいおん", "k-on"],
    },
    Franchise {
        name: "Gundam",
        keywords: &["ガンダム", "gundam"],
    },
    Franchise {
        name: "Macross",
        keywords: &["マクロス", "macross"],
    },
    Franchise {
        name: "Re:Zero",
        keywords: &["リゼロ", "re:zero", "re：zero"],
    },
    Franchise {
        name: "Demon Slayer",
        keywords: &["鬼滅", "demon slayer", "kimetsu"],
    },
    Franchise {
        name: "Jujutsu Kaisen",
        keywords: &["呪術廻戦", "jujutsu kaisen"],
    },
    Franchise {
        name: "Attack on Titan",
        keywords: &["進撃の巨人", "attack on titan", "shingeki"],
    },
    Franchise {
        name: "One Piece",
        keywords: &["ワンピース", "one piece"],
    },
    Franchise {
        name: "Naruto",
        keywords: &["ナルト", "naruto", "boruto"],
    },
    Franchise {
        name: "Bleach",
        keywords: &["ブリーチ", "bleach"],
    },
    Franchise {
        name: "Dragon Ball",
        keywords: &["ドラゴンボール", "dragon ball"],
    },
    Franchise {
        name: "Evangelion",
        keywords: &["エヴァンゲリオン", "evangelion", "エヴァ"],
    },
    Franchise {
        name: "SAO",
        keywords: &["ソードアート", "sword art online"],
    },
    Franchise {
        name: "Chainsaw Man",
        keywords: &["チェンソーマン", "chainsaw man"],
    },
    Franchise {
        name: "SPY×FAMILY",
        keywords: &["スパイファミリー", "spy x family", "spy×family", "spy family"],
    },
    Franchise {
        name: "Bocchi the Rock!",
        keywords: &["ぼっち・ざ・ろっく", "bocchi the rock"],
    },
    Franchise {
        name: "Oshi no Ko",
        keywords: &["推しの子", "oshi no ko"],
    },
];

impl Franchise {
    /// Whether a lowercased title contains any keyword of this franchise.
    fn matches_lowercase(&self, title: &str) -> bool {
        self.keywords.iter().any(|keyword| title.contains(keyword))
    }
}

/// First franchise whose keywords appear in both titles.
///
/// The two titles may match through different keywords of the same entry,
/// e.g. "ラブライブ" and "love live".
pub fn shared_franchise(seed_title: &str, candidate_title: &str) -> Option<&'static Franchise> {
    let seed = seed_title.to_lowercase();
    let candidate = candidate_title.to_lowercase();

    FRANCHISES
        .iter()
        .find(|f| f.matches_lowercase(&seed) && f.matches_lowercase(&candidate))
}

/// Franchise named in a single title, if any.
pub fn detect(title: &str) -> Option<&'static Franchise> {
    let title = title.to_lowercase();
    FRANCHISES.iter().find(|f| f.matches_lowercase(&title))
}
