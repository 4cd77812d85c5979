use std::time::Duration;

use async_trait::async_trait;
use core_types::{
    AnswerOutcome, ApiError, ApiResult, AskResponse, ChatMessage, Classification, Confidence,
    ContentLocator, Document, DocumentAnalysis, DocumentApi, DocumentId, EntityMap,
    ExtractedTable, MessageId, ModelInfo, SearchResult, Summary, UploadFile, parse_timestamp,
};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, RANGE};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct HttpApiOptions {
    pub base_url: String,
    pub api_prefix: String,
    pub timeout: Option<Duration>,
    pub extra_headers: Vec<(String, String)>,
}

impl HttpApiOptions {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_prefix: "/api/v1".to_owned(),
            timeout: None,
            extra_headers: Vec::new(),
        }
    }
}

/// [`DocumentApi`] over the backend's `/documents` REST surface.
#[derive(Debug, Clone)]
pub struct HttpDocumentApi {
    client: Client,
    root: Url,
}

impl HttpDocumentApi {
    pub fn new(options: HttpApiOptions) -> ApiResult<Self> {
        let mut root = Url::parse(options.base_url.trim())
            .map_err(|err| ApiError::InvalidRequest(format!("invalid base url: {err}")))?;
        if root.cannot_be_a_base() {
            return Err(ApiError::InvalidRequest(format!(
                "base url `{}` cannot carry a path",
                options.base_url
            )));
        }
        {
            let mut path = root
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidRequest("base url has no path".to_owned()))?;
            path.pop_if_empty();
            path.extend(options.api_prefix.split('/').filter(|s| !s.is_empty()));
            path.push("documents");
        }

        let mut headers = HeaderMap::new();
        apply_extra_headers(&mut headers, &options.extra_headers)?;
        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|err| ApiError::InvalidRequest(format!("failed to build client: {err}")))?;

        Ok(Self { client, root })
    }

    pub fn root(&self) -> &Url {
        &self.root
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.root.clone();
        // `root` was checked to be a base in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn document_url(&self, document_id: &DocumentId, tail: &str) -> Url {
        self.url(&[document_id.as_str(), tail])
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        debug!(%url, "GET");
        let response = self.client.get(url).send().await.map_err(transport)?;
        read_json(response).await
    }

    async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> ApiResult<T> {
        debug!(%url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }
}

#[async_trait]
impl DocumentApi for HttpDocumentApi {
    async fn upload(&self, file: UploadFile) -> ApiResult<Document> {
        if file.file_name.trim().is_empty() {
            return Err(ApiError::InvalidRequest("upload needs a file name".to_owned()));
        }
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)
            .map_err(|err| ApiError::InvalidRequest(format!("invalid content type: {err}")))?;
        let form = Form::new().part("file", part);
        let url = self.url(&["upload"]);
        debug!(%url, "POST multipart");
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        read_json(response).await
    }

    async fn list_documents(&self) -> ApiResult<Vec<Document>> {
        self.get_json(self.url(&["list"])).await
    }

    async fn search_documents(&self, query: &str) -> ApiResult<Vec<Document>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list_documents().await;
        }
        let mut url = self.url(&["search"]);
        url.query_pairs_mut().append_pair("query", query);
        self.get_json(url).await
    }

    async fn content_locator(&self, document_id: &DocumentId) -> ApiResult<ContentLocator> {
        let url = self.document_url(document_id, "content");
        debug!(%url, "check content");
        // Only the headers are needed; a single-byte range keeps the file on the server.
        let response = self
            .client
            .get(url.clone())
            .header(RANGE, "bytes=0-0")
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.split(';').next().unwrap_or(value).trim().to_owned())
            .unwrap_or_else(|| "application/octet-stream".to_owned());
        // 206 for the range, or 200 from servers that ignore it. The body stays
        // unread either way; the viewer fetches it through the locator.
        Ok(ContentLocator {
            url: url.to_string(),
            content_type,
        })
    }

    async fn list_models(&self) -> ApiResult<Vec<ModelInfo>> {
        self.get_json(self.url(&["models"])).await
    }

    async fn ask_question(
        &self,
        document_id: &DocumentId,
        question: &str,
        model_id: &str,
    ) -> ApiResult<AskResponse> {
        let body = AskRequest { question, model_id };
        self.post_json(self.document_url(document_id, "ask"), &body)
            .await
    }

    async fn rag_search(&self, query: &str, model_id: Option<&str>) -> ApiResult<SearchResult> {
        let body = RagSearchRequest { query, model_id };
        self.post_json(self.url(&["rag-search"]), &body).await
    }

    async fn chat_history(&self, document_id: &DocumentId) -> ApiResult<Vec<ChatMessage>> {
        let records: Vec<WireChatMessage> = self
            .get_json(self.document_url(document_id, "chat-history"))
            .await?;
        let mut messages = records
            .into_iter()
            .map(WireChatMessage::into_message)
            .collect::<ApiResult<Vec<_>>>()?;
        messages.sort_by_key(ChatMessage::created_at);
        Ok(messages)
    }

    async fn analysis(&self, document_id: &DocumentId) -> ApiResult<DocumentAnalysis> {
        self.get_json(self.document_url(document_id, "analysis"))
            .await
    }

    async fn entities(&self, document_id: &DocumentId) -> ApiResult<EntityMap> {
        self.get_json(self.document_url(document_id, "entities"))
            .await
    }

    async fn summary(&self, document_id: &DocumentId) -> ApiResult<Summary> {
        self.get_json(self.document_url(document_id, "summary"))
            .await
    }

    async fn tables(&self, document_id: &DocumentId) -> ApiResult<Vec<ExtractedTable>> {
        self.get_json(self.document_url(document_id, "tables"))
            .await
    }

    async fn classification(&self, document_id: &DocumentId) -> ApiResult<Classification> {
        self.get_json(self.document_url(document_id, "classification"))
            .await
    }
}

fn transport(err: reqwest::Error) -> ApiError {
    warn!(error = %err, "backend request failed");
    ApiError::RequestFailed(err.to_string())
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    let text = response.text().await.map_err(transport)?;
    if !status.is_success() {
        warn!(status = status.as_u16(), "backend returned error status");
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: text,
        });
    }
    serde_json::from_str(&text).map_err(|err| ApiError::Decode(err.to_string()))
}

fn apply_extra_headers(headers: &mut HeaderMap, extra_headers: &[(String, String)]) -> ApiResult<()> {
    for (key, value) in extra_headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| ApiError::InvalidRequest(format!("invalid header name: {key}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|_| ApiError::InvalidRequest(format!("invalid header value for {key}")))?;
        headers.insert(name, value);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct AskRequest<'a> {
    question: &'a str,
    model_id: &'a str,
}

#[derive(Debug, Serialize)]
struct RagSearchRequest<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    model_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireMessageKind {
    Question,
    Answer,
}

#[derive(Debug, Deserialize)]
struct WireChatMessage {
    id: String,
    #[serde(rename = "type")]
    kind: WireMessageKind,
    content: String,
    timestamp: String,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    model_name: Option<String>,
}

impl WireChatMessage {
    fn into_message(self) -> ApiResult<ChatMessage> {
        let created_at = parse_timestamp(&self.timestamp)
            .ok_or_else(|| ApiError::Decode(format!("invalid timestamp `{}`", self.timestamp)))?;
        let id = MessageId::new(self.id);
        Ok(match self.kind {
            WireMessageKind::Question => ChatMessage::Question {
                id,
                text: self.content,
                model_id: self.model_name,
                created_at,
            },
            WireMessageKind::Answer => {
                let outcome = match (self.success, self.confidence) {
                    (Some(false), _) | (_, None) => AnswerOutcome::Unanswered,
                    (_, Some(confidence)) => AnswerOutcome::Answered {
                        confidence: Confidence::new(confidence),
                    },
                };
                ChatMessage::Answer {
                    id,
                    text: self.content,
                    outcome,
                    model_name: self.model_name,
                    created_at,
                }
            }
        })
    }
}
