//! Prompt assembly.
//!
//! Pure functions that turn retrieved context and a question (or the fixed
//! extraction instruction) into chat messages. No side effects, no network
//! calls; everything observable about a request to the completion endpoint
//! is decided here.
//!
//! The assistant targets Chinese-language risk and compliance documents, so
//! the instruction frames are Chinese. The extraction schema keys stay
//! English per the wire contract in [`crate::events`].

use crate::index::ScoredChunk;
use crate::models::ChatMessage;

/// Number of chunks retrieved for structured extraction. Wider than Q&A
/// retrieval so events spread across the document are not missed.
pub const EXTRACTION_TOP_K: usize = 10;

/// Sampling temperature for structured extraction. Low, to favor
/// deterministic JSON over creative phrasing.
pub const EXTRACTION_TEMPERATURE: f32 = 0.1;

/// Fixed retrieval query used for extraction instead of a user question.
/// Keyword-dense so similarity search surfaces event- and risk-bearing
/// passages.
pub const EXTRACTION_QUERY: &str = "风险 事件 事故 危险 预警 应急 处置 措施 隐患";

const EXTRACTION_SYSTEM_PROMPT: &str = "你是一名风险管理分析助手。请从给定的文档片段中提取风险事件，\
并仅输出以下 JSON 结构，不要添加任何解释或 Markdown 代码块标记：\n\
{\"events\": [{\"event_name\": \"事件名称\", \"risk_level\": \"高/中/低\", \
\"key_action\": \"关键处置动作（20字以内）\", \"page_ref\": 页码数字或null}]}\n\
如果没有发现风险事件，输出 {\"events\": []}。";

/// Build the question-answering prompt: retrieved passages followed by the
/// user's question, as a single user message.
pub fn qa_prompt(context: &[ScoredChunk], question: &str) -> String {
    format!(
        "基于以下参考片段回答问题：\n\n{}\n\n问题：{}",
        joined_texts(context),
        question
    )
}

/// Build the extraction message pair: a system instruction enumerating the
/// output schema, and a user message carrying the retrieved passages with
/// page annotations.
pub fn extraction_messages(context: &[ScoredChunk]) -> Vec<ChatMessage> {
    let user = format!(
        "以下是文档的相关片段：\n\n{}\n\n请从以上内容中提取所有风险事件。",
        annotated_context(context)
    );

    vec![
        ChatMessage::system(EXTRACTION_SYSTEM_PROMPT),
        ChatMessage::user(user),
    ]
}

fn joined_texts(context: &[ScoredChunk]) -> String {
    context
        .iter()
        .map(|scored| scored.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Join passages with page markers so the model can ground `page_ref`.
/// Passages without a known page are included unannotated.
fn annotated_context(context: &[ScoredChunk]) -> String {
    context
        .iter()
        .map(|scored| match scored.chunk.page {
            Some(page) => format!("[第{}页] {}", page, scored.chunk.text),
            None => scored.chunk.text.clone(),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Chunk, Role};

    fn scored(text: &str, page: Option<u32>) -> ScoredChunk {
        ScoredChunk {
            chunk: Chunk {
                text: text.to_string(),
                sequence_index: 0,
                start_char: 0,
                overlap_chars: 0,
                page,
            },
            score: 0.5,
        }
    }

    #[test]
    fn qa_prompt_follows_template() {
        let context = vec![scored("第一段。", Some(1)), scored("第二段。", Some(2))];
        let prompt = qa_prompt(&context, "合同金额是多少？");

        assert_eq!(
            prompt,
            "基于以下参考片段回答问题：\n\n第一段。\n\n第二段。\n\n问题：合同金额是多少？"
        );
    }

    #[test]
    fn qa_prompt_with_empty_context() {
        let prompt = qa_prompt(&[], "有什么风险？");
        assert_eq!(prompt, "基于以下参考片段回答问题：\n\n\n\n问题：有什么风险？");
    }

    #[test]
    fn extraction_messages_are_system_then_user() {
        let context = vec![scored("发生了火灾。", Some(3))];
        let messages = extraction_messages(&context);

        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].role, Role::User);
        assert!(messages[0].content.contains("\"events\""));
        assert!(messages[0].content.contains("risk_level"));
        assert!(messages[0].content.contains("page_ref"));
    }

    #[test]
    fn extraction_context_carries_page_markers() {
        let context = vec![scored("火灾事件。", Some(3)), scored("无页码片段。", None)];
        let messages = extraction_messages(&context);

        assert!(messages[1].content.contains("[第3页] 火灾事件。"));
        assert!(messages[1].content.contains("无页码片段。"));
        assert!(!messages[1].content.contains("[第0页]"));
    }

    #[test]
    fn extraction_constants() {
        assert_eq!(EXTRACTION_TOP_K, 10);
        assert!((EXTRACTION_TEMPERATURE - 0.1).abs() < f32::EPSILON);
        assert!(!EXTRACTION_QUERY.is_empty());
    }
}
