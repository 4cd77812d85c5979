use std::collections::BTreeMap;

use core_types::{IndexingStatus, UiLanguage};

#[derive(Debug, Clone)]
pub struct I18n {
    lang: UiLanguage,
    zh_cn: BTreeMap<&'static str, &'static str>,
    en_us: BTreeMap<&'static str, &'static str>,
}

impl I18n {
    pub fn new(lang: UiLanguage) -> Self {
        Self {
            lang,
            zh_cn: zh_cn_map(),
            en_us: en_us_map(),
        }
    }

    pub fn set_language(&mut self, lang: UiLanguage) {
        self.lang = lang;
    }

    pub fn language(&self) -> UiLanguage {
        self.lang
    }

    pub fn t<'a>(&'a self, key: &'a str) -> &'a str {
        match self.lang {
            UiLanguage::ZhCn => self
                .zh_cn
                .get(key)
                .copied()
                .or_else(|| self.en_us.get(key).copied())
                .unwrap_or(key),
            UiLanguage::EnUs => self
                .en_us
                .get(key)
                .copied()
                .or_else(|| self.zh_cn.get(key).copied())
                .unwrap_or(key),
        }
    }

    pub fn indexing_status(&self, status: IndexingStatus) -> &str {
        match status {
            IndexingStatus::Pending => self.t("status.pending"),
            IndexingStatus::Processing => self.t("status.processing"),
            IndexingStatus::Completed => self.t("status.completed"),
            IndexingStatus::Failed => self.t("status.failed"),
        }
    }
}

fn zh_cn_map() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("app.title", "文档智能助手"),
        ("app.ready", "输入 help 查看可用命令"),
        ("app.bye", "再见"),
        ("help.list", "list                 刷新文档列表"),
        ("help.search", "search <关键词>      搜索文档（输入停顿后发送）"),
        ("help.select", "select <序号|ID>     选择文档"),
        ("help.ask", "ask <问题>           就当前文档提问"),
        ("help.history", "history              查看当前文档的对话记录"),
        ("help.models", "models [refresh]     列出可用模型（refresh 重新获取）"),
        ("help.model", "model <ID>           切换模型"),
        ("help.analysis", "analysis             查看文档分析结果"),
        ("help.rag", "rag <问题>           跨文档检索问答"),
        ("help.upload", "upload <路径>        上传文件（先检查类型与大小）"),
        ("help.drop", "drop <路径>          直接上传并选中文件"),
        ("help.status", "status               显示当前状态"),
        ("help.lang", "lang <zh|en>         切换界面语言"),
        ("help.quit", "quit                 退出"),
        ("label.documents", "文档"),
        ("label.selected", "当前文档"),
        ("label.none", "（无）"),
        ("label.size", "大小"),
        ("label.uploaded", "上传时间"),
        ("label.indexing", "索引状态"),
        ("label.content", "内容地址"),
        ("label.models", "模型"),
        ("label.model", "当前模型"),
        ("label.default", "默认"),
        ("label.question", "问"),
        ("label.answer", "答"),
        ("label.confidence", "置信度"),
        ("label.history", "对话记录"),
        ("label.pending", "等待回答"),
        ("label.analysis", "文档分析"),
        ("label.category", "分类"),
        ("label.entities", "实体"),
        ("label.summary", "摘要"),
        ("label.tables", "表格"),
        ("label.sources", "来源"),
        ("label.relevance", "相关度"),
        ("label.query", "搜索词"),
        ("status.pending", "等待中"),
        ("status.processing", "处理中"),
        ("status.completed", "已完成"),
        ("status.failed", "失败"),
        ("msg.no_document", "请先选择一个文档"),
        ("msg.blank_question", "问题不能为空"),
        ("msg.no_model", "请先选择模型"),
        ("msg.unknown_command", "未知命令"),
        ("msg.unknown_document", "找不到该文档"),
        ("msg.unknown_model", "找不到该模型"),
        ("msg.uploaded", "已上传"),
        ("msg.upload_failed", "上传失败"),
        ("msg.upload_warning", "提示"),
        ("msg.read_failed", "无法读取文件"),
        ("msg.searching", "正在搜索"),
        ("msg.discarded", "结果已过期，已忽略"),
        ("msg.rag_busy", "上一次检索仍在进行"),
        ("msg.request_failed", "请求失败"),
        ("msg.loading", "加载中"),
        ("msg.content_unavailable", "内容暂不可用"),
        ("msg.history_empty", "暂无对话"),
        ("msg.language", "界面语言已切换"),
        ("msg.usage", "用法"),
    ])
}

fn en_us_map() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        ("app.title", "Docintel document assistant"),
        ("app.ready", "Type `help` to see the available commands"),
        ("app.bye", "Bye"),
        ("help.list", "list                 refresh the document list"),
        (
            "help.search",
            "search <text>        filter documents (sent after you stop typing)",
        ),
        ("help.select", "select <index|id>    select a document"),
        ("help.ask", "ask <question>       ask about the selected document"),
        ("help.history", "history              show the selected document's chat"),
        ("help.models", "models [refresh]     list available models (refresh refetches)"),
        ("help.model", "model <id>           choose a model"),
        ("help.analysis", "analysis             show the document analysis"),
        ("help.rag", "rag <query>          ask across all documents"),
        (
            "help.upload",
            "upload <path>        upload a file after checking type and size",
        ),
        ("help.drop", "drop <path>          upload and select a file as-is"),
        ("help.status", "status               show the current state"),
        ("help.lang", "lang <zh|en>         switch the interface language"),
        ("help.quit", "quit                 exit"),
        ("label.documents", "Documents"),
        ("label.selected", "Selected"),
        ("label.none", "(none)"),
        ("label.size", "Size"),
        ("label.uploaded", "Uploaded"),
        ("label.indexing", "Indexing"),
        ("label.content", "Content"),
        ("label.models", "Models"),
        ("label.model", "Model"),
        ("label.default", "default"),
        ("label.question", "Q"),
        ("label.answer", "A"),
        ("label.confidence", "Confidence"),
        ("label.history", "Chat history"),
        ("label.pending", "Awaiting answers"),
        ("label.analysis", "Analysis"),
        ("label.category", "Category"),
        ("label.entities", "Entities"),
        ("label.summary", "Summary"),
        ("label.tables", "Tables"),
        ("label.sources", "Sources"),
        ("label.relevance", "relevance"),
        ("label.query", "Query"),
        ("status.pending", "pending"),
        ("status.processing", "processing"),
        ("status.completed", "completed"),
        ("status.failed", "failed"),
        ("msg.no_document", "Select a document first"),
        ("msg.blank_question", "The question is empty"),
        ("msg.no_model", "Choose a model first"),
        ("msg.unknown_command", "Unknown command"),
        ("msg.unknown_document", "No such document"),
        ("msg.unknown_model", "No such model"),
        ("msg.uploaded", "Uploaded"),
        ("msg.upload_failed", "Upload failed"),
        ("msg.upload_warning", "Warning"),
        ("msg.read_failed", "Could not read file"),
        ("msg.searching", "Searching"),
        ("msg.discarded", "Result arrived too late and was ignored"),
        ("msg.rag_busy", "The previous search is still running"),
        ("msg.request_failed", "Request failed"),
        ("msg.loading", "Loading"),
        ("msg.content_unavailable", "Content unavailable"),
        ("msg.history_empty", "No messages yet"),
        ("msg.language", "Interface language changed"),
        ("msg.usage", "Usage"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_chinese_translation() {
        let i18n = I18n::new(UiLanguage::ZhCn);
        assert_eq!(i18n.t("label.documents"), "文档");
        assert_eq!(i18n.indexing_status(IndexingStatus::Completed), "已完成");
    }

    #[test]
    fn falls_back_to_key_when_missing() {
        let i18n = I18n::new(UiLanguage::EnUs);
        assert_eq!(i18n.t("not.exists"), "not.exists");
    }

    #[test]
    fn switching_language_changes_labels() {
        let mut i18n = I18n::new(UiLanguage::EnUs);
        assert_eq!(i18n.t("label.sources"), "Sources");
        i18n.set_language(UiLanguage::ZhCn);
        assert_eq!(i18n.language(), UiLanguage::ZhCn);
        assert_eq!(i18n.t("label.sources"), "来源");
    }

    #[test]
    fn both_tables_cover_the_same_keys() {
        let zh: Vec<_> = zh_cn_map().into_keys().collect();
        let en: Vec<_> = en_us_map().into_keys().collect();
        assert_eq!(zh, en);
    }
}
