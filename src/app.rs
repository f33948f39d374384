//! 应用入口 - 编排层之上
//!
//! 持有模型后端、考纲和各用例，按命令行执行一个功能并把结果写入输出目录：
//! 题目、记忆卡片、学习计划和复盘报告写成 JSON，讲解类文本写成 Markdown。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{
    load_syllabus_or_builtin, Document, Mistake, QuizSet, StudyPlan, Subject, SyllabusCatalog,
};
use crate::orchestrator::WatchReporter;
use crate::services::{GenerationBackend, LlmService, StudyAssistant};
use crate::utils::logging::{init_log_file, log_startup, print_final_stats};
use crate::workflow::{GenerationOutcome, StudyGenerator, UseCase, UseCaseRequest};

const USAGE: &str = "用法:
  prep_ai quiz <子主题>
  prep_ai simulacro [考试名称]
  prep_ai pdf <文件路径>
  prep_ai flashcards <子主题>
  prep_ai leccion <子主题>
  prep_ai simplificar <文本>
  prep_ai plan <周数> <每周学时> [考试名称]
  prep_ai plan-pdf <周数> <每周学时> <文件路径>
  prep_ai pista <题目 JSON> <题号>
  prep_ai revisar <题目 JSON> <作答，如 2,1,-,4>";

/// 命令行命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// 子主题小测
    Quiz { sub_topic: String },
    /// 模拟考试，不指定时使用考纲中的第一个考试
    Simulation { subject: Option<String> },
    /// 基于文档的模拟考试
    Pdf { path: PathBuf },
    /// 记忆卡片
    Flashcards { sub_topic: String },
    /// 子主题讲解
    Lesson { sub_topic: String },
    /// 简化解释一段文字
    Simplify { text: String },
    /// 按考纲生成学习计划
    Plan {
        weeks: u32,
        hours_per_week: u32,
        subject: Option<String>,
    },
    /// 按上传的考纲文档生成学习计划
    PlanFromDocument {
        weeks: u32,
        hours_per_week: u32,
        path: PathBuf,
    },
    /// 为已生成题目中的一道（从 1 开始编号）给出提示
    Hint { quiz: PathBuf, number: usize },
    /// 按作答批改已生成的题目并分析错题，`None` 表示未作答
    Review {
        quiz: PathBuf,
        answers: Vec<Option<usize>>,
    },
}

impl Command {
    /// 从命令行参数解析（不含程序名）
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args: Vec<String> = args.into_iter().collect();
        if args.is_empty() {
            bail!("缺少命令\n{}", USAGE);
        }
        let name = args.remove(0);
        let joined = args.join(" ");
        let rest = joined.trim();

        let command = match name.as_str() {
            "quiz" if !rest.is_empty() => Command::Quiz {
                sub_topic: rest.to_string(),
            },
            "simulacro" => Command::Simulation {
                subject: non_empty(rest),
            },
            "pdf" if !rest.is_empty() => Command::Pdf {
                path: PathBuf::from(rest),
            },
            "flashcards" if !rest.is_empty() => Command::Flashcards {
                sub_topic: rest.to_string(),
            },
            "leccion" if !rest.is_empty() => Command::Lesson {
                sub_topic: rest.to_string(),
            },
            "simplificar" if !rest.is_empty() => Command::Simplify {
                text: rest.to_string(),
            },
            "plan" if args.len() >= 2 => Command::Plan {
                weeks: parse_number(&args[0], "周数")?,
                hours_per_week: parse_number(&args[1], "每周学时")?,
                subject: non_empty(args[2..].join(" ").trim()),
            },
            "plan-pdf" if args.len() >= 3 => Command::PlanFromDocument {
                weeks: parse_number(&args[0], "周数")?,
                hours_per_week: parse_number(&args[1], "每周学时")?,
                path: PathBuf::from(args[2..].join(" ")),
            },
            "pista" if args.len() == 2 => Command::Hint {
                quiz: PathBuf::from(&args[0]),
                number: parse_number(&args[1], "题号")?,
            },
            "revisar" if args.len() == 2 => Command::Review {
                quiz: PathBuf::from(&args[0]),
                answers: parse_answers(&args[1])?,
            },
            _ => bail!("无法识别的命令: {} {}\n{}", name, rest, USAGE),
        };
        Ok(command)
    }
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

fn parse_number<T: std::str::FromStr>(arg: &str, what: &str) -> Result<T> {
    arg.trim()
        .parse()
        .map_err(|_| anyhow!("{} 必须是非负整数: {}", what, arg))
}

/// 解析 `2,1,-,4` 形式的作答：选项从 1 开始编号，`-` 或空表示未作答
fn parse_answers(arg: &str) -> Result<Vec<Option<usize>>> {
    arg.split(',')
        .map(str::trim)
        .map(|answer| match answer {
            "" | "-" => Ok(None),
            _ => match answer.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(Some(n - 1)),
                _ => Err(anyhow!("无效的作答: {}", answer)),
            },
        })
        .collect()
}

/// 批改结果
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReviewReport {
    score: usize,
    total: usize,
    mistakes: Vec<Mistake>,
    analysis: String,
}

/// 应用主结构
pub struct App {
    config: Config,
    syllabus: SyllabusCatalog,
    generator: StudyGenerator,
    assistant: StudyAssistant,
}

impl App {
    /// 初始化应用：校验配置、写日志文件头、创建模型服务
    pub async fn initialize(config: Config) -> Result<Self> {
        config.validate()?;

        init_log_file(&config.output_log_file)?;
        log_startup(&config.llm_model_name, &config.llm_api_base_url);

        let backend: Arc<dyn GenerationBackend> = Arc::new(LlmService::new(&config)?);
        Self::with_backend(config, backend).await
    }

    /// 使用指定的生成后端组装应用
    pub async fn with_backend(config: Config, backend: Arc<dyn GenerationBackend>) -> Result<Self> {
        let syllabus = load_syllabus_or_builtin(config.syllabus_file.as_deref())
            .await
            .context("加载考纲失败")?;
        info!("📚 考纲: {} 个考试", syllabus.subjects.len());

        Ok(Self {
            config,
            syllabus,
            generator: StudyGenerator::new(backend.clone()),
            assistant: StudyAssistant::new(backend),
        })
    }

    pub fn syllabus(&self) -> &SyllabusCatalog {
        &self.syllabus
    }

    pub fn assistant(&self) -> &StudyAssistant {
        &self.assistant
    }

    /// 执行一条命令，返回结果文件路径
    pub async fn run(&self, command: Command) -> Result<PathBuf> {
        match command {
            Command::Quiz { sub_topic } => {
                match self.syllabus.locate_sub_topic(&sub_topic) {
                    Some((subject, topic)) => {
                        info!("📖 {} / {} / {}", subject.name, topic.name, sub_topic)
                    }
                    None => warn!("⚠️ 子主题不在考纲中，仍按原文出题: {}", sub_topic),
                }
                let request = UseCaseRequest::TopicQuiz {
                    sub_topic: &sub_topic,
                };
                self.run_use_case(request, &sub_topic).await
            }
            Command::Simulation { subject } => {
                let subject = self.resolve_subject(subject.as_deref())?;
                self.run_use_case(UseCaseRequest::FullSimulation { subject }, &subject.name)
                    .await
            }
            Command::Pdf { path } => {
                let document = read_document(&path).await?;
                let request = UseCaseRequest::DocumentSimulation {
                    document: &document,
                };
                self.run_use_case(request, &file_stem(&path)).await
            }
            Command::Flashcards { sub_topic } => {
                let cards = self.assistant.generate_flashcards(&sub_topic).await?;
                let path = self
                    .write_output(&format!("flashcards_{}", sub_topic), &cards)
                    .await?;
                let output = path.display().to_string();
                print_final_stats("记忆卡片", cards.len(), cards.len(), &output);
                Ok(path)
            }
            Command::Lesson { sub_topic } => {
                let lesson = self.assistant.generate_lesson(&sub_topic).await?;
                self.write_text_output(&format!("leccion_{}", sub_topic), &lesson)
                    .await
            }
            Command::Simplify { text } => {
                let explanation = self.assistant.explain_simpler(&text).await?;
                self.write_text_output("explicacion", &explanation).await
            }
            Command::Plan {
                weeks,
                hours_per_week,
                subject,
            } => {
                let subject = self.resolve_subject(subject.as_deref())?;
                let plan = self
                    .assistant
                    .generate_study_plan(&subject.name, subject, weeks, hours_per_week)
                    .await?;
                self.write_plan(&plan, &subject.name).await
            }
            Command::PlanFromDocument {
                weeks,
                hours_per_week,
                path,
            } => {
                let document = read_document(&path).await?;
                let plan = self
                    .assistant
                    .generate_study_plan_from_document(&document, weeks, hours_per_week)
                    .await?;
                self.write_plan(&plan, &file_stem(&path)).await
            }
            Command::Hint { quiz, number } => {
                let quiz = load_quiz(&quiz).await?;
                let question = number
                    .checked_sub(1)
                    .and_then(|i| quiz.questions.get(i))
                    .ok_or_else(|| anyhow!("题号 {} 超出范围 (共 {} 题)", number, quiz.len()))?;

                let hint = self
                    .assistant
                    .generate_hint(&question.question, &question.options)
                    .await;
                info!("💡 第 {} 题提示: {}", number, hint);
                self.write_text_output(&format!("pista_{}", number), &hint)
                    .await
            }
            Command::Review { quiz, answers } => {
                let quiz = load_quiz(&quiz).await?;
                if answers.len() != quiz.len() {
                    bail!("作答数量 {} 与题目数量 {} 不一致", answers.len(), quiz.len());
                }

                let mistakes = quiz.mistakes(&answers);
                let analysis = self.assistant.analyze_mistakes(&mistakes).await;
                let report = ReviewReport {
                    score: quiz.score(&answers),
                    total: quiz.len(),
                    mistakes,
                    analysis,
                };
                info!("📝 得分: {}/{}", report.score, report.total);
                self.write_output("revision", &report).await
            }
        }
    }

    async fn write_plan(&self, plan: &StudyPlan, name: &str) -> Result<PathBuf> {
        for week in 1..=plan.weeks {
            info!("📅 第 {} 周: {} 个学习日", week, plan.week(week).len());
        }
        self.write_output(&format!("plan_{}", name), plan).await
    }

    fn resolve_subject(&self, name: Option<&str>) -> Result<&Subject> {
        let subject = match name {
            Some(name) => self.syllabus.subject(name),
            None => self.syllabus.subjects.first(),
        };
        subject.ok_or_else(|| {
            let available = self
                .syllabus
                .subjects
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            anyhow!("找不到考试 {:?}，可选: {}", name.unwrap_or_default(), available)
        })
    }

    /// 执行出题用例，进度通过 watch 通道实时写入日志
    async fn run_use_case(&self, request: UseCaseRequest<'_>, name: &str) -> Result<PathBuf> {
        let use_case = request.use_case();
        let (mut reporter, mut receiver) = WatchReporter::channel();

        let listener = tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let state = *receiver.borrow_and_update();
                info!(
                    "[{}] 📈 进度: {}/{} ({:.0}%)",
                    use_case,
                    state.completed,
                    state.total,
                    state.percentage()
                );
            }
        });

        let outcome = self.generator.run(request, &mut reporter).await;

        // 关闭发送端，监听任务随之结束
        drop(reporter);
        if let Err(e) = listener.await {
            warn!("进度监听任务异常结束: {}", e);
        }

        match outcome {
            GenerationOutcome::Ready(quiz) => {
                let path = self.write_output(&output_stem(use_case, name), &quiz).await?;
                print_final_stats(
                    &use_case.to_string(),
                    quiz.len(),
                    use_case.plan().total_target(),
                    &path.display().to_string(),
                );
                Ok(path)
            }
            GenerationOutcome::Failed { message } => Err(anyhow!(message)),
        }
    }

    /// 把结果写成格式化的 JSON 文件
    async fn write_output<T: Serialize>(&self, stem: &str, value: &T) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(value)?;
        self.write_file(stem, "json", &json).await
    }

    /// 讲解、提示等文本结果写成 Markdown 文件
    async fn write_text_output(&self, stem: &str, text: &str) -> Result<PathBuf> {
        let path = self.write_file(stem, "md", text).await?;
        info!("结果已保存至: {}", path.display());
        Ok(path)
    }

    async fn write_file(&self, stem: &str, extension: &str, content: &str) -> Result<PathBuf> {
        let dir = Path::new(&self.config.output_dir);
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("创建输出目录失败: {}", dir.display()))?;

        let file_name = format!(
            "{}_{}.{}",
            sanitize_file_stem(stem),
            chrono::Local::now().format("%Y%m%d_%H%M%S"),
            extension
        );
        let path = dir.join(file_name);

        fs::write(&path, content)
            .await
            .with_context(|| format!("写入结果失败: {}", path.display()))?;

        Ok(path)
    }
}

async fn read_document(path: &Path) -> Result<Document> {
    Document::from_path(path)
        .await
        .with_context(|| format!("读取文档失败: {}", path.display()))
}

/// 读取之前生成的题目文件
async fn load_quiz(path: &Path) -> Result<QuizSet> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("读取题目文件失败: {}", path.display()))?;
    let quiz: QuizSet = serde_json::from_str(&content)
        .with_context(|| format!("题目文件格式错误: {}", path.display()))?;
    if quiz.is_empty() {
        bail!("题目文件中没有题目: {}", path.display());
    }
    Ok(quiz)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "documento".to_string())
}

fn output_stem(use_case: UseCase, name: &str) -> String {
    let prefix = match use_case {
        UseCase::TopicQuiz => "quiz",
        UseCase::FullSimulation => "simulacro",
        UseCase::DocumentSimulation => "pdf",
    };
    format!("{}_{}", prefix, name)
}

/// 文件名只保留字母数字，其余替换为下划线
fn sanitize_file_stem(stem: &str) -> String {
    stem.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
