use serde::{Deserialize, Serialize};

/// 学习日状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    #[default]
    Pending,
    Completed,
}

/// 计划中的一天：学习一个子主题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlanDay {
    pub day: u32,
    pub week: u32,
    pub sub_topic: String,
    pub topic: String,
    #[serde(default)]
    pub status: DayStatus,
}

/// 按周排列的备考计划（每周按 5 个学习日安排）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyPlan {
    pub university: String,
    pub weeks: u32,
    pub hours_per_week: u32,
    #[serde(default)]
    pub plan: Vec<StudyPlanDay>,
}

impl StudyPlan {
    /// 某一周的学习日，按天排序
    pub fn week(&self, week: u32) -> Vec<&StudyPlanDay> {
        let mut days: Vec<&StudyPlanDay> = self.plan.iter().filter(|d| d.week == week).collect();
        days.sort_by_key(|d| d.day);
        days
    }
}
