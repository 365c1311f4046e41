use crate::gateway::ScenarioDraft;
use crate::models::{Scenario, new_id};

struct Builtin {
    id: &'static str,
    title: &'static str,
    icon: &'static str,
    description: &'static str,
    cheat_sheet: [&'static str; 4],
}

const BUILTINS: [Builtin; 4] = [
    Builtin {
        id: "coffee",
        title: "點咖啡 (Ordering Coffee)",
        icon: "fa-coffee",
        description: "練習在當地的咖啡館點餐與客製化飲品。",
        cheat_sheet: ["我想點一杯...", "微糖少冰", "內用還是外帶？", "多少錢？"],
    },
    Builtin {
        id: "checkin",
        title: "飯店辦理入住 (Hotel Check-in)",
        icon: "fa-hotel",
        description: "處理預訂資訊、詢問設施與早餐時間。",
        cheat_sheet: ["我有預約", "早餐幾點開始？", "有提供 Wi-Fi 嗎？", "延遲退房"],
    },
    Builtin {
        id: "emergency",
        title: "緊急情況 (Emergency)",
        icon: "fa-ambulance",
        description: "迷路、遺失物品或身體不適時的求助。",
        cheat_sheet: ["請幫幫我", "我的護照丟了", "最近的醫院在哪？", "我迷路了"],
    },
    Builtin {
        id: "casual",
        title: "日常閒聊 (Casual Chat)",
        icon: "fa-comments",
        description: "與新朋友交談，分享愛好與週末計劃。",
        cheat_sheet: ["你最近好嗎？", "你平常喜歡做什麼？", "很高興認識你", "這天氣真不錯"],
    },
];

/// The practice scenarios every conversation session starts with.
pub fn builtin_scenarios() -> Vec<Scenario> {
    BUILTINS
        .iter()
        .map(|b| Scenario {
            id: b.id.to_string(),
            title: b.title.to_string(),
            icon: b.icon.to_string(),
            description: b.description.to_string(),
            cheat_sheet: b.cheat_sheet.iter().map(|s| s.to_string()).collect(),
            is_custom: false,
        })
        .collect()
}

/// Turns a generated draft into a custom scenario with a fresh `custom-` id.
pub fn custom_from_draft(draft: ScenarioDraft) -> Scenario {
    Scenario {
        id: format!("custom-{}", new_id()),
        title: draft.title,
        icon: draft.icon,
        description: draft.description,
        cheat_sheet: draft.cheat_sheet,
        is_custom: true,
    }
}
