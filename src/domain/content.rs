//! Fixed demo copy: lecture catalog, canned chat replies, voice script

/// A short-form lecture shown in the video carousel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LectureVideo {
    pub title: &'static str,
    pub duration: &'static str,
    /// Thumbnail background colour
    pub color: &'static str,
}

pub const LECTURE_VIDEOS: [LectureVideo; 4] = [
    LectureVideo { title: "올바른 수유 자세", duration: "3분", color: "#FFE4D6" },
    LectureVideo { title: "트림시키는 방법", duration: "2분", color: "#FFF0E6" },
    LectureVideo { title: "기저귀 가는 법", duration: "2분", color: "#FFE4D6" },
    LectureVideo { title: "아기 목욕시키기", duration: "4분", color: "#FFF0E6" },
];

/// What the simulated voice capture "hears"
pub const VOICE_TRANSCRIPT: &str = "왼쪽 15분 먹였어";

/// What the simulated assistant answers after transcription
pub const VOICE_RESPONSE: &str = "왼쪽 15분 수유를 기록했어요. 다음 수유는 3시간 뒤에 알려드릴게요.";

/// Reply used when a chat message has no canned response
pub const CHAT_FALLBACK_RESPONSE: &str =
    "기록해 둘게요. 궁금한 점이 있으면 언제든 편하게 물어보세요!";

/// Suggested prompt with its canned answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatPrompt {
    pub question: &'static str,
    pub answer: &'static str,
}

pub const CHAT_PROMPTS: [ChatPrompt; 3] = [
    ChatPrompt {
        question: "아기가 밤에 자꾸 깨요",
        answer: "생후 4개월 무렵에는 수면 패턴이 바뀌면서 자주 깰 수 있어요. 잠들기 전 루틴을 일정하게 유지해 보세요.",
    },
    ChatPrompt {
        question: "수유량이 적당한가요?",
        answer: "지안이는 하루 평균 780ml를 먹고 있어요. 142일 아기에게 알맞은 양이에요.",
    },
    ChatPrompt {
        question: "트림은 언제 시켜요?",
        answer: "수유 중간과 끝난 직후에 세워 안고 등을 부드럽게 토닥여 주세요.",
    },
];

/// Find the canned answer for a suggested prompt
pub fn canned_answer(question: &str) -> Option<&'static str> {
    let question = question.trim();
    CHAT_PROMPTS.iter().find(|p| p.question == question).map(|p| p.answer)
}

/// Confirmation shown after a successful subscription
pub const SUBSCRIBE_THANKS: &str = "감사합니다!";

/// Error shown when the backend gave no message
pub const SUBSCRIBE_FALLBACK_ERROR: &str = "오류가 발생했습니다.";

/// Error shown when the request never reached the backend
pub const NETWORK_ERROR_MESSAGE: &str = "네트워크 오류가 발생했습니다.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canned_answer_lookup() {
        assert_eq!(canned_answer("트림은 언제 시켜요?"), Some(CHAT_PROMPTS[2].answer));
        assert_eq!(canned_answer("  수유량이 적당한가요?  "), Some(CHAT_PROMPTS[1].answer));
        assert_eq!(canned_answer("오늘 날씨 어때?"), None);
    }
}
