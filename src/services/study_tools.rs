//! 学习辅助能力 - 业务能力层
//!
//! 课程讲解、简化解释、记忆卡片、学习计划、提示、错题分析。
//! 每个都是单次模型调用，没有批次。

use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{AppResult, GenerationError, ParseError};
use crate::models::{Document, Flashcard, Mistake, StudyPlan, Subject};
use crate::services::backend::{CompletionRequest, GenerationBackend};
use crate::utils::parse_tolerant;

pub const HINT_FALLBACK: &str =
    "No se pudo generar una pista en este momento. Intenta resolverlo por tu cuenta.";
pub const ANALYSIS_FALLBACK: &str = "No se pudo generar el análisis de errores en este momento. Revisa las explicaciones de cada pregunta para entender tus fallos.";

const HINT_TEMPERATURE: f32 = 0.8;

/// 学习计划按每周 5 个学习日安排
const STUDY_DAYS_PER_WEEK: u32 = 5;

pub struct StudyAssistant {
    backend: Arc<dyn GenerationBackend>,
}

impl StudyAssistant {
    pub fn new(backend: Arc<dyn GenerationBackend>) -> Self {
        Self { backend }
    }

    /// 生成一篇 Markdown 格式的子主题讲解（公式用 LaTeX），失败直接返回错误
    pub async fn generate_lesson(&self, sub_topic: &str) -> AppResult<String> {
        let prompt = format!(
            r#"Genera una lección detallada sobre el siguiente subtema: "{}".

REGLAS DE FORMATO:
1. Separa cada párrafo, título, lista y tabla con una línea en blanco.
2. Títulos principales en negritas (`**1. Introducción Conceptual**`); subtítulos con `### `.
3. Listas con un asterisco y un espacio al inicio de cada elemento.
4. Usa LaTeX para TODAS las fórmulas: `$...$` en línea y `$$...$$` en bloque.
5. Usa tablas Markdown siempre que la información se pueda comparar o resumir.

ESTRUCTURA:
**1. Introducción Conceptual:** qué es el tema y por qué es importante.
**2. Explicación Detallada:** los principios clave, con subtítulos.
**3. Ejemplos Tipo Examen Resueltos:** 3-4 ejemplos; primero la pregunta, luego las opciones una por línea y al final la solución paso a paso.
**4. Resumen Clave:** puntos finales a memorizar.

El tono debe ser motivador y de apoyo."#,
            sub_topic
        );

        let request = CompletionRequest::new(prompt).with_system(
            "Actúa como un profesor universitario experto, muy didáctico y amigable, especializado en preparar a estudiantes de último año de secundaria para exámenes de admisión universitaria.",
        );
        let lesson = self.backend.complete(&request).await?;

        info!("✓ 生成讲解: {} ({} 字符)", sub_topic, lesson.chars().count());
        Ok(lesson)
    }

    /// 用更简单的语言重新解释一段文字，失败直接返回错误
    pub async fn explain_simpler(&self, text: &str) -> AppResult<String> {
        let prompt = format!(
            r#"Toma el siguiente texto y explícalo de una manera mucho más simple, como si se lo estuvieras explicando a un amigo. Usa analogías y ejemplos cotidianos. Mantén la precisión pero elimina la jerga técnica.

Texto a simplificar:
"{}"

Responde únicamente con la explicación simplificada."#,
            text
        );

        let request = CompletionRequest::new(prompt)
            .with_system("Actúa como un tutor experto en simplificar conceptos complejos.");
        self.backend.complete(&request).await
    }

    /// 按考纲生成逐日学习计划
    ///
    /// # 参数
    /// - `university`: 考试名称，写入计划
    /// - `syllabus`: 考纲，全部子主题都要排进计划
    /// - `weeks` / `hours_per_week`: 必须为正
    pub async fn generate_study_plan(
        &self,
        university: &str,
        syllabus: &Subject,
        weeks: u32,
        hours_per_week: u32,
    ) -> AppResult<StudyPlan> {
        check_plan_params(weeks, hours_per_week)?;

        let prompt = format!(
            r#"Un estudiante necesita un plan de estudio personalizado para prepararse para el examen de admisión de "{}".

Parámetros del estudiante:
- Semanas disponibles: {}
- Horas de estudio por semana: {}

Temario completo:
```
{}
```

Tarea:
Crea un plan de estudio detallado, día por día. Distribuye todos los subtemas del temario de manera equilibrada a lo largo de las semanas. Asume que el estudiante estudia {} días a la semana. Calcula cuántos subtemas debe estudiar por día para cubrir todo el material. Todos los días empiezan con estado "pending"."#,
            university,
            weeks,
            hours_per_week,
            syllabus.outline(),
            STUDY_DAYS_PER_WEEK
        );

        let request = CompletionRequest::new(prompt)
            .with_system("Actúa como un planificador académico experto.")
            .with_schema(study_plan_schema());
        self.request_study_plan(&request, university).await
    }

    /// 从上传的考纲文档（PDF）中提取主题并生成学习计划
    pub async fn generate_study_plan_from_document(
        &self,
        document: &Document,
        weeks: u32,
        hours_per_week: u32,
    ) -> AppResult<StudyPlan> {
        check_plan_params(weeks, hours_per_week)?;

        let prompt = format!(
            r#"Tienes acceso a un documento adjunto que contiene el temario oficial de un examen de admisión universitaria.

TUS OBJETIVOS:
1. Analizar el documento: extrae la universidad, la materia y todos los temas y subtemas listados.
2. Crear un plan de estudio: genera un calendario detallado de {} semanas, con una carga de {} horas semanales (estudio {} días a la semana).
3. Calidad: la progresión debe ir de lo básico a lo avanzado y cubrir TODO el contenido del documento.

Si el documento no menciona explícitamente el nombre de la universidad, usa "Universidad del PDF" o infiérelo del contexto. Todos los días empiezan con estado "pending"."#,
            weeks, hours_per_week, STUDY_DAYS_PER_WEEK
        );

        let request = CompletionRequest::new(prompt)
            .with_system("Actúa como un experto diseñador curricular de élite.")
            .with_document(Some(document.clone()))
            .with_schema(study_plan_schema());
        self.request_study_plan(&request, "documento").await
    }

    async fn request_study_plan(
        &self,
        request: &CompletionRequest,
        label: &str,
    ) -> AppResult<StudyPlan> {
        let raw = self.backend.complete(request).await?;
        let plan: StudyPlan = parse_tolerant(&raw).map_err(|e| ParseError::JsonParseFailed {
            context: "study plan".to_string(),
            source: e,
        })?;

        if plan.plan.is_empty() {
            warn!("学习计划没有任何学习日: {}", label);
        } else {
            info!(
                "✓ 生成学习计划: {} ({} 周, {} 个学习日)",
                plan.university,
                plan.weeks,
                plan.plan.len()
            );
        }
        Ok(plan)
    }

    /// 为子主题生成 10-15 张记忆卡片，失败直接返回错误
    pub async fn generate_flashcards(&self, sub_topic: &str) -> AppResult<Vec<Flashcard>> {
        let prompt = format!(
            r#"Actúa como un experto en técnicas de memorización. Genera un set de 10-15 flashcards para el siguiente subtema: "{}".
Cada flashcard debe tener un "term" (término, concepto o pregunta clave) y una "definition" (definición o respuesta concisa y clara).
Enfócate en los conceptos más importantes que un estudiante debería memorizar."#,
            sub_topic
        );

        let request = CompletionRequest::new(prompt).with_schema(flashcard_schema());
        let raw = self.backend.complete(&request).await?;

        #[derive(Deserialize)]
        struct FlashcardSet {
            flashcards: Vec<Flashcard>,
        }

        let set: FlashcardSet = parse_tolerant(&raw).map_err(|e| ParseError::JsonParseFailed {
            context: "flashcards".to_string(),
            source: e,
        })?;

        info!("✓ 生成 {} 张记忆卡片: {}", set.flashcards.len(), sub_topic);
        Ok(set.flashcards)
    }

    /// 生成不泄露答案的提示，失败时返回固定文案
    pub async fn generate_hint(&self, question: &str, options: &[String]) -> String {
        let numbered = options
            .iter()
            .enumerate()
            .map(|(i, opt)| format!("{}. {}", i + 1, opt))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            r#"Un estudiante está atascado en la siguiente pregunta de opción múltiple. Proporciona una pista sutil que lo guíe hacia la respuesta correcta SIN revelarla. Puedes hacer una pregunta retórica o recordarle una fórmula o un principio relevante.

Pregunta: "{}"
Opciones:
{}

Genera solo la pista. Sé breve y directo."#,
            question, numbered
        );

        let request = CompletionRequest::new(prompt)
            .with_system("Actúa como un tutor experto y amigable.")
            .with_temperature(HINT_TEMPERATURE);

        match self.backend.complete(&request).await {
            Ok(hint) => hint,
            Err(e) => {
                warn!("提示生成失败: {}", e);
                HINT_FALLBACK.to_string()
            }
        }
    }

    /// 分析错题规律，失败时返回固定文案
    pub async fn analyze_mistakes(&self, mistakes: &[Mistake]) -> String {
        if mistakes.is_empty() {
            return "¡Excelente trabajo! No cometiste errores en este examen.".to_string();
        }

        let listing = mistakes
            .iter()
            .enumerate()
            .map(|(i, m)| {
                format!(
                    "---\n**Error #{}**\n**Pregunta:** {}\n**Respuesta del estudiante:** {}\n**Respuesta correcta:** {}\n**Explicación:** {}\n---",
                    i + 1,
                    m.question,
                    m.user_answer,
                    m.correct_answer,
                    m.explanation
                )
            })
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            r#"Un estudiante acaba de terminar un examen y ha cometido los siguientes errores:

{}

Analiza los errores para identificar patrones y conceptos que no comprende bien.
1. No repitas las explicaciones; busca el porqué detrás de los errores.
2. Sé constructivo y alentador; empieza con una frase positiva.
3. Resume tus hallazgos en 2-3 recomendaciones claras y accionables.
4. Usa Markdown: negritas para conceptos clave y listas con asteriscos.

Genera únicamente el análisis."#,
            listing
        );

        let request = CompletionRequest::new(prompt)
            .with_system("Actúa como un tutor universitario experto, empático y perspicaz.");

        match self.backend.complete(&request).await {
            Ok(analysis) => analysis,
            Err(e) => {
                warn!("错题分析失败 ({} 道错题): {}", mistakes.len(), e);
                ANALYSIS_FALLBACK.to_string()
            }
        }
    }
}

fn check_plan_params(weeks: u32, hours_per_week: u32) -> Result<(), GenerationError> {
    if weeks == 0 || hours_per_week == 0 {
        return Err(GenerationError::InvalidStudyPlan {
            weeks,
            hours_per_week,
        });
    }
    Ok(())
}

fn study_plan_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "university": { "type": "string" },
            "weeks": { "type": "integer" },
            "hoursPerWeek": { "type": "integer" },
            "plan": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "day": { "type": "integer" },
                        "week": { "type": "integer" },
                        "subTopic": { "type": "string" },
                        "topic": { "type": "string" },
                        "status": { "type": "string", "enum": ["pending", "completed"] }
                    },
                    "required": ["day", "week", "subTopic", "topic", "status"]
                }
            }
        },
        "required": ["university", "weeks", "hoursPerWeek", "plan"]
    })
}

fn flashcard_schema() -> JsonValue {
    json!({
        "type": "object",
        "properties": {
            "flashcards": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "term": { "type": "string" },
                        "definition": { "type": "string" }
                    },
                    "required": ["term", "definition"]
                }
            }
        },
        "required": ["flashcards"]
    })
}
