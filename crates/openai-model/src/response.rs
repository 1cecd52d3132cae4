use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use pin_project_lite::pin_project;
use scout_model::{
    ErrorKind, ModelFinishReason, ModelResponse, ModelResponseEvent,
    ToolCallRequest,
};

use crate::Error;
use crate::io::Sse;
use crate::proto::{ChatCompletionChunk, ToolCallDelta};

#[derive(Default)]
struct PartialToolCall {
    index: Option<u32>,
    id: String,
    name: String,
    arguments: String,
}

impl PartialToolCall {
    fn patch(&mut self, delta: ToolCallDelta) {
        if let Some(id) = delta.id {
            self.id.push_str(&id);
        }
        if let Some(function) = delta.function {
            if let Some(name) = function.name {
                self.name.push_str(&name);
            }
            if let Some(arguments) = function.arguments {
                self.arguments.push_str(&arguments);
            }
        }
    }
}

struct PartialState {
    sse: Sse,
    id: Option<String>,
    tool_calls: Vec<PartialToolCall>,
    // Tool calls are only handed out once the stream is drained, since
    // their arguments may arrive in fragments until the very end.
    pending_tool_calls: VecDeque<ToolCallRequest>,
    pending_finish_reason: Option<ModelFinishReason>,
    drained: bool,
}

impl PartialState {
    fn merge_tool_calls(&mut self, deltas: Vec<ToolCallDelta>) {
        for delta in deltas {
            let existing = self
                .tool_calls
                .iter_mut()
                .find(|t| delta.index.is_some() && t.index == delta.index);
            match existing {
                Some(partial) => partial.patch(delta),
                None => {
                    let mut partial = PartialToolCall {
                        index: delta.index,
                        ..Default::default()
                    };
                    partial.patch(delta);
                    self.tool_calls.push(partial);
                }
            }
        }
    }

    fn drain(&mut self) {
        self.drained = true;
        self.pending_tool_calls = self
            .tool_calls
            .drain(..)
            .map(|partial| ToolCallRequest {
                id: partial.id,
                name: partial.name,
                arguments: partial.arguments,
            })
            .collect();
        if !self.pending_tool_calls.is_empty() {
            // Some servers report `stop` even though tools were requested.
            self.pending_finish_reason = Some(ModelFinishReason::ToolCalls);
        }
    }
}

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextEvent = Result<(Option<ModelResponseEvent>, PartialState), Error>;

pin_project! {
    pub struct OpenAIResponse {
        next_event_fut: Option<PinnedFuture<NextEvent>>,
        message_id: Option<String>,
    }
}

impl OpenAIResponse {
    #[inline]
    pub fn from_sse(sse: Sse) -> Self {
        let partial_state = PartialState {
            sse,
            id: None,
            tool_calls: Default::default(),
            pending_tool_calls: Default::default(),
            pending_finish_reason: Default::default(),
            drained: false,
        };
        let next_event_fut = async move { next_event(partial_state).await };
        Self {
            next_event_fut: Some(Box::pin(next_event_fut)),
            message_id: None,
        }
    }
}

impl ModelResponse for OpenAIResponse {
    type Error = crate::Error;

    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>> {
        let this = self.project();
        let Some(next_event_fut) = this.next_event_fut else {
            return Poll::Ready(Ok(None));
        };
        let (event, partial_state) =
            match ready!(next_event_fut.as_mut().poll(cx)) {
                Ok((Some(event), partial_state)) => (event, partial_state),
                Ok((None, partial_state)) => {
                    *this.next_event_fut = None;
                    *this.message_id = partial_state.id;
                    return Poll::Ready(Ok(None));
                }
                Err(err) => {
                    *this.next_event_fut = None;
                    return Poll::Ready(Err(err));
                }
            };

        // The stream may still have more data to pull, create a new future for
        // the next event.
        let next_event_fut = async move { next_event(partial_state).await };
        *this.next_event_fut = Some(Box::pin(next_event_fut));

        Poll::Ready(Ok(Some(event)))
    }

    fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }
}

async fn next_event(
    mut partial_state: PartialState,
) -> Result<(Option<ModelResponseEvent>, PartialState), Error> {
    while !partial_state.drained {
        let sse_event = match partial_state.sse.next_event().await {
            Ok(Some(event)) => event,
            Ok(None) => {
                partial_state.drain();
                break;
            }
            Err(err) => {
                return Err(Error::new(
                    format!("broken event stream: {err:?}"),
                    ErrorKind::Other,
                ));
            }
        };
        trace!("got sse event: {sse_event}");
        if sse_event == "[DONE]" {
            partial_state.drain();
            break;
        }

        let mut chunk = serde_json::from_str::<ChatCompletionChunk>(&sse_event)
            .map_err(|err| Error::new(format!("{err}"), ErrorKind::Other))?;
        if partial_state.id.get_or_insert_with(|| chunk.id.clone()) != &chunk.id
        {
            return Err(Error::new("chunk id mismatch", ErrorKind::Other));
        };

        // Usage reports come in chunks without choices.
        let Some(choice) = chunk.choices.pop() else {
            continue;
        };

        if let Some(tool_calls) = choice.delta.tool_calls {
            partial_state.merge_tool_calls(tool_calls);
        }
        if let Some(finish_reason) = choice.finish_reason {
            partial_state.pending_finish_reason =
                Some(match finish_reason.as_str() {
                    "tool_calls" => ModelFinishReason::ToolCalls,
                    _ => ModelFinishReason::Stop,
                });
        }
        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                return Ok((
                    Some(ModelResponseEvent::MessageDelta(content)),
                    partial_state,
                ));
            }
        }
    }

    // The order of events are important. Message deltas are all emitted
    // above, then the tool calls, and finally the finish reason.

    if let Some(tool_call) = partial_state.pending_tool_calls.pop_front() {
        let event = ModelResponseEvent::ToolCall(tool_call);
        return Ok((Some(event), partial_state));
    }

    if let Some(finish_reason) = partial_state.pending_finish_reason.take() {
        return Ok((
            Some(ModelResponseEvent::Completed(finish_reason)),
            partial_state,
        ));
    }

    Ok((None, partial_state))
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use bytes::Bytes;

    use super::*;
    use crate::io::Chunks;

    async fn collect(
        body: &'static [u8],
    ) -> (Vec<ModelResponseEvent>, Option<String>) {
        let chunks =
            Chunks::from_vec_deque(vec![Bytes::from_static(body)].into());
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let mut events = vec![];
        while let Some(event) = poll_fn(|cx| resp.as_mut().poll_next_event(cx))
            .await
            .unwrap()
        {
            events.push(event);
        }
        (events, resp.message_id().map(ToOwned::to_owned))
    }

    #[tokio::test]
    async fn test_tool_call_events() {
        let body = include_bytes!("../fixtures/tool_calls_response.txt");
        let (events, id) = collect(body).await;

        let tool_calls: Vec<_> = events
            .iter()
            .filter_map(|event| match event {
                ModelResponseEvent::ToolCall(req) => Some(req),
                _ => None,
            })
            .collect();
        assert_eq!(tool_calls.len(), 2);
        assert_eq!(tool_calls[0].name, "tavily_search_results_json");
        assert_eq!(tool_calls[0].arguments, r#"{"query": "weather in Paris"}"#);
        assert_eq!(tool_calls[1].id, "call_b2");
        assert_eq!(tool_calls[1].arguments, r#"{"query": "weather in Rome"}"#);
        assert_eq!(
            events.last(),
            Some(&ModelResponseEvent::Completed(ModelFinishReason::ToolCalls))
        );
        assert_eq!(id.as_deref(), Some("chatcmpl-7f3a"));
    }

    #[tokio::test]
    async fn test_text_events() {
        let (events, id) =
            collect(include_bytes!("../fixtures/text_response.txt")).await;
        assert_eq!(
            events,
            vec![
                ModelResponseEvent::MessageDelta("It is ".to_owned()),
                ModelResponseEvent::MessageDelta("sunny.".to_owned()),
                ModelResponseEvent::Completed(ModelFinishReason::Stop),
            ]
        );
        assert_eq!(id.as_deref(), Some("chatcmpl-9c1d"));
    }

    #[tokio::test]
    async fn test_mismatched_chunk_ids() {
        let chunks = Chunks::from_vec_deque(
            vec![Bytes::from_static(
                b"data: {\"id\":\"a\",\"choices\":[{\"delta\":{\"content\":\"x\"},\"finish_reason\":null}]}\n\n\
                  data: {\"id\":\"b\",\"choices\":[{\"delta\":{\"content\":\"y\"},\"finish_reason\":null}]}\n\n",
            )]
            .into(),
        );
        let mut resp = pin!(OpenAIResponse::from_sse(Sse::new(chunks)));
        let first = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await;
        assert!(matches!(first, Ok(Some(ModelResponseEvent::MessageDelta(_)))));
        let second = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await;
        assert!(second.is_err());
        let third = poll_fn(|cx| resp.as_mut().poll_next_event(cx)).await;
        assert!(matches!(third, Ok(None)));
    }
}
