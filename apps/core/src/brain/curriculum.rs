//! The fourth-grade maths curriculum the tutor covers.

use serde::Serialize;

/// One lesson of the curriculum and the vocabulary that signals it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CurriculumLesson {
    pub title: &'static str,
    pub lesson_id: &'static str,
    pub keywords: &'static [&'static str],
}

pub static CURRICULUM: [CurriculumLesson; 5] = [
    CurriculumLesson {
        title: "Bài 1: Ôn tập các số đến 100000",
        lesson_id: "bai_1_on_tap_cac_so",
        keywords: &[
            "đọc số",
            "viết số",
            "chữ số",
            "hàng",
            "giá trị vị trí",
            "hàng đơn vị",
            "hàng chục",
            "hàng trăm",
            "hàng nghìn",
            "hàng vạn",
            "số đến 100000",
            "100000",
            "100 nghìn",
        ],
    },
    CurriculumLesson {
        title: "Bài 2: Ôn tập các phép tính trong phạm vi 100000",
        lesson_id: "bai_2_on_tap_cac_phep_tinh",
        keywords: &[
            "cộng",
            "trừ",
            "nhân",
            "chia",
            "phép tính",
            "tổng",
            "hiệu",
            "tích",
            "thương",
            "tính nhẩm",
            "đặt tính",
        ],
    },
    CurriculumLesson {
        title: "Bài 3: Số chẵn số lẻ",
        lesson_id: "bai_3_so_chan_so_le",
        keywords: &["số chẵn", "số lẻ", "chẵn", "lẻ", "chia hết cho 2", "dư", "phép chia"],
    },
    CurriculumLesson {
        title: "Bài về Phân số",
        lesson_id: "bai_phan_so",
        keywords: &[
            "phân số",
            "tử số",
            "mẫu số",
            "rút gọn",
            "so sánh phân số",
            "quy đồng",
            "phân số bằng nhau",
        ],
    },
    CurriculumLesson {
        title: "Bài về Hình học",
        lesson_id: "bai_hinh_hoc",
        keywords: &[
            "hình",
            "chu vi",
            "diện tích",
            "hình chữ nhật",
            "hình vuông",
            "hình tam giác",
            "chiều dài",
            "chiều rộng",
            "cạnh",
        ],
    },
];

/// Looks up a lesson by id.
pub fn lesson(lesson_id: &str) -> Option<&'static CurriculumLesson> {
    CURRICULUM.iter().find(|l| l.lesson_id == lesson_id)
}

/// Renders the curriculum for the classification prompt, one block per lesson
/// with its first ten keywords.
pub fn format_for_prompt() -> String {
    CURRICULUM
        .iter()
        .map(|l| {
            let keywords: Vec<&str> = l.keywords.iter().take(10).copied().collect();
            format!(
                "- {} (ID: {})\n  Keywords: {}...",
                l.title,
                l.lesson_id,
                keywords.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Guesses the lesson a question belongs to by counting keyword hits.
///
/// Ties go to the lesson listed first. Returns `None` when nothing matches.
pub fn best_lesson_for(query: &str) -> Option<&'static CurriculumLesson> {
    let text = query.to_lowercase();
    let mut best: Option<(&'static CurriculumLesson, usize)> = None;

    for lesson in CURRICULUM.iter() {
        let hits = lesson.keywords.iter().filter(|k| text.contains(*k)).count();
        if hits == 0 {
            continue;
        }
        match best {
            Some((_, best_hits)) if best_hits >= hits => {}
            _ => best = Some((lesson, hits)),
        }
    }

    best.map(|(lesson, _)| lesson)
}
