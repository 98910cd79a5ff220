use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use whiteboard_core::{
    AssistantService, AssistantSpec, Run, RunStatus, ServiceError, ToolCall, ToolOutput,
};

const SERVICE: &str = "openai";

/// OpenAI Assistants (v2) client.
pub struct OpenAiAssistants {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiAssistants {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(format!("{}{}", self.base_url, path)))
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(format!("{}{}", self.base_url, path)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ServiceError> {
        let response = request.send().await.map_err(|e| ServiceError::Transport {
            service: SERVICE.to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Status {
                service: SERVICE.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(|e| ServiceError::Decode {
            service: SERVICE.to_string(),
            message: e.to_string(),
        })
    }
}

#[derive(Serialize)]
struct CreateAssistantRequest<'a> {
    model: &'a str,
    name: &'a str,
    instructions: &'a str,
    tools: Vec<FunctionTool<'a>>,
}

#[derive(Serialize)]
struct FunctionTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: FunctionDefinition<'a>,
}

#[derive(Serialize)]
struct FunctionDefinition<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a serde_json::Value,
}

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
}

#[derive(Serialize)]
struct SubmitToolOutputsRequest<'a> {
    tool_outputs: &'a [ToolOutput],
}

#[derive(Deserialize)]
struct IdObject {
    id: String,
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    thread_id: String,
    status: RunStatus,
    #[serde(default)]
    required_action: Option<RequiredAction>,
}

#[derive(Deserialize)]
struct RequiredAction {
    submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Deserialize)]
struct SubmitToolOutputs {
    tool_calls: Vec<RunToolCall>,
}

#[derive(Deserialize)]
struct RunToolCall {
    id: String,
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

impl From<RunObject> for Run {
    fn from(run: RunObject) -> Self {
        let tool_calls = run
            .required_action
            .map(|action| {
                action
                    .submit_tool_outputs
                    .tool_calls
                    .into_iter()
                    .map(|call| ToolCall {
                        id: call.id,
                        name: call.function.name,
                        arguments: call.function.arguments,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Run {
            id: run.id,
            thread_id: run.thread_id,
            status: run.status,
            tool_calls,
        }
    }
}

#[async_trait]
impl AssistantService for OpenAiAssistants {
    fn name(&self) -> &str {
        SERVICE
    }

    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<String, ServiceError> {
        let body = CreateAssistantRequest {
            model: &spec.model,
            name: &spec.name,
            instructions: &spec.instructions,
            tools: spec
                .tools
                .iter()
                .map(|tool| FunctionTool {
                    kind: "function",
                    function: FunctionDefinition {
                        name: &tool.name,
                        description: &tool.description,
                        parameters: &tool.parameters,
                    },
                })
                .collect(),
        };

        debug!(model = %spec.model, "Creating assistant");
        let created: IdObject = Self::send(self.post("/assistants").json(&body)).await?;
        Ok(created.id)
    }

    async fn create_thread(&self) -> Result<String, ServiceError> {
        let created: IdObject =
            Self::send(self.post("/threads").json(&serde_json::json!({}))).await?;
        Ok(created.id)
    }

    async fn add_message(&self, thread_id: &str, content: &str) -> Result<(), ServiceError> {
        let body = CreateMessageRequest {
            role: "user",
            content,
        };
        let _: serde_json::Value =
            Self::send(self.post(&format!("/threads/{thread_id}/messages")).json(&body)).await?;
        Ok(())
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run, ServiceError> {
        let body = CreateRunRequest { assistant_id };
        let run: RunObject =
            Self::send(self.post(&format!("/threads/{thread_id}/runs")).json(&body)).await?;
        Ok(run.into())
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run, ServiceError> {
        let run: RunObject =
            Self::send(self.get(&format!("/threads/{thread_id}/runs/{run_id}"))).await?;
        Ok(run.into())
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &str,
        run_id: &str,
        outputs: &[ToolOutput],
    ) -> Result<Run, ServiceError> {
        let body = SubmitToolOutputsRequest {
            tool_outputs: outputs,
        };
        debug!(run_id, count = outputs.len(), "Submitting tool outputs");
        let run: RunObject = Self::send(
            self.post(&format!(
                "/threads/{thread_id}/runs/{run_id}/submit_tool_outputs"
            ))
            .json(&body),
        )
        .await?;
        Ok(run.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_object_with_required_action() {
        let json = r#"{
            "id": "run_abc",
            "object": "thread.run",
            "thread_id": "thread_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "createShape",
                            "arguments": "{\"x\":0,\"y\":0,\"w\":50,\"h\":50}"
                        }
                    }]
                }
            }
        }"#;
        let run: Run = serde_json::from_str::<RunObject>(json).unwrap().into();
        assert_eq!(run.id, "run_abc");
        assert_eq!(run.status, RunStatus::RequiresAction);
        assert_eq!(
            run.tool_calls,
            vec![ToolCall::new(
                "call_1",
                "createShape",
                r#"{"x":0,"y":0,"w":50,"h":50}"#
            )]
        );
    }

    #[test]
    fn test_run_object_without_required_action() {
        let json = r#"{"id": "run_abc", "thread_id": "thread_1", "status": "in_progress", "required_action": null}"#;
        let run: Run = serde_json::from_str::<RunObject>(json).unwrap().into();
        assert_eq!(run.status, RunStatus::InProgress);
        assert!(run.tool_calls.is_empty());
    }

    #[test]
    fn test_create_assistant_body_wraps_function_tools() {
        let parameters = serde_json::json!({"type": "object", "properties": {}});
        let body = CreateAssistantRequest {
            model: "gpt-4o",
            name: "whiteboard",
            instructions: "draw",
            tools: vec![FunctionTool {
                kind: "function",
                function: FunctionDefinition {
                    name: "createShape",
                    description: "Create a rectangle",
                    parameters: &parameters,
                },
            }],
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["tools"][0]["type"], "function");
        assert_eq!(value["tools"][0]["function"]["name"], "createShape");
        assert_eq!(value["tools"][0]["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_tool_outputs_body() {
        let outputs = vec![ToolOutput {
            tool_call_id: "call_1".into(),
            output: "Success".into(),
        }];
        let value = serde_json::to_value(SubmitToolOutputsRequest {
            tool_outputs: &outputs,
        })
        .unwrap();
        assert_eq!(
            value,
            serde_json::json!({"tool_outputs": [{"tool_call_id": "call_1", "output": "Success"}]})
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAiAssistants::new("key").with_base_url("http://localhost:9000/v1/");
        assert_eq!(client.base_url, "http://localhost:9000/v1");
    }
}
