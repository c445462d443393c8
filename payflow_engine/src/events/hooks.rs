use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{EventHandler, EventProducer, Handler, NotificationCreatedEvent, PaymentEvent};

/// The producer side of every registered hook. Cheap to clone; hand a copy to each component that emits events.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub payment_event_producer: Vec<EventProducer<PaymentEvent>>,
    pub notification_producer: Vec<EventProducer<NotificationCreatedEvent>>,
}

pub struct EventHandlers {
    pub on_payment_event: Option<EventHandler<PaymentEvent>>,
    pub on_notification_created: Option<EventHandler<NotificationCreatedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_payment_event = hooks.on_payment_event.map(|f| EventHandler::new(buffer_size, f));
        let on_notification_created = hooks.on_notification_created.map(|f| EventHandler::new(buffer_size, f));
        Self { on_payment_event, on_notification_created }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_payment_event {
            result.payment_event_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_notification_created {
            result.notification_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_payment_event {
            tokio::spawn(async move {
                handler.start_handler().await;
                info!("📬️ Payment event hook has stopped");
            });
        }
        if let Some(handler) = self.on_notification_created {
            tokio::spawn(async move {
                handler.start_handler().await;
                info!("📬️ Notification hook has stopped");
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_payment_event: Option<Handler<PaymentEvent>>,
    pub on_notification_created: Option<Handler<NotificationCreatedEvent>>,
}

impl EventHooks {
    pub fn on_payment_event<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(PaymentEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_payment_event = Some(Arc::new(f));
        self
    }

    pub fn on_notification_created<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(NotificationCreatedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_notification_created = Some(Arc::new(f));
        self
    }
}
