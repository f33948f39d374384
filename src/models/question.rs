use serde::{Deserialize, Serialize};

/// 每道选择题固定的选项数量
pub const OPTION_COUNT: usize = 4;

/// 单道选择题
///
/// 生成后不再修改；`correct_answer_index` 为 `options` 的 0 基下标。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionItem {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer_index: usize,
    pub explanation: String,
}

impl QuestionItem {
    /// 正确选项的文本
    pub fn correct_option(&self) -> Option<&str> {
        self.options
            .get(self.correct_answer_index)
            .map(String::as_str)
    }

    /// 判断作答是否正确
    pub fn is_correct(&self, answer_index: usize) -> bool {
        answer_index == self.correct_answer_index
    }
}

/// 一次编排生成的题目集合（按批次发起顺序拼接，可能少于目标数量）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSet {
    pub questions: Vec<QuestionItem>,
}

impl QuizSet {
    pub fn new(questions: Vec<QuestionItem>) -> Self {
        Self { questions }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// 按作答计算得分，未作答（None）记为错误
    pub fn score(&self, answers: &[Option<usize>]) -> usize {
        self.questions
            .iter()
            .zip(answers.iter())
            .filter(|(q, a)| a.map(|idx| q.is_correct(idx)).unwrap_or(false))
            .count()
    }

    /// 收集答错的题目，供错题分析使用
    pub fn mistakes(&self, answers: &[Option<usize>]) -> Vec<Mistake> {
        self.questions
            .iter()
            .zip(answers.iter())
            .filter_map(|(q, answer)| match answer {
                Some(idx) if q.is_correct(*idx) => None,
                _ => Some(Mistake {
                    question: q.question.clone(),
                    user_answer: answer
                        .and_then(|idx| q.options.get(idx).cloned())
                        .unwrap_or_else(|| "Sin responder".to_string()),
                    correct_answer: q.correct_option().unwrap_or_default().to_string(),
                    explanation: q.explanation.clone(),
                }),
            })
            .collect()
    }
}

/// 记忆卡片
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    pub term: String,
    pub definition: String,
}

/// 一道答错的题目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mistake {
    pub question: String,
    pub user_answer: String,
    pub correct_answer: String,
    pub explanation: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(correct: usize) -> QuestionItem {
        QuestionItem {
            question: "¿Cuánto es 2 + 2?".to_string(),
            options: vec!["3".into(), "4".into(), "5".into(), "6".into()],
            correct_answer_index: correct,
            explanation: "2 + 2 = 4".to_string(),
        }
    }

    #[test]
    fn test_question_item_wire_format_is_camel_case() {
        let json = serde_json::to_value(item(1)).unwrap();
        assert_eq!(json["correctAnswerIndex"], 1);
        assert_eq!(json["options"].as_array().unwrap().len(), OPTION_COUNT);
    }

    #[test]
    fn test_score_and_mistakes() {
        let quiz = QuizSet::new(vec![item(1), item(1), item(1)]);
        let answers = [Some(1), Some(2), None];

        assert_eq!(quiz.score(&answers), 1);

        let mistakes = quiz.mistakes(&answers);
        assert_eq!(mistakes.len(), 2);
        assert_eq!(mistakes[0].user_answer, "5");
        assert_eq!(mistakes[0].correct_answer, "4");
        assert_eq!(mistakes[1].user_answer, "Sin responder");
    }
}
