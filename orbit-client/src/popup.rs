//! Transient notification popups.
//!
//! One presenter lays out the popup list; where it goes and how many items
//! it shows is decided by a [`PositionStrategy`].

use chrono::{DateTime, Utc};
use orbit_server::models::{Notification, NotificationKind};

use crate::sync::NotificationHandle;
use crate::time::time_ago_compact;

/// Routes on which popups never show
pub const SUPPRESSED_ROUTES: [&str; 2] = ["/notifications", "/chat"];

const FIXED_TOP: f64 = 80.0;
const EDGE_MARGIN: f64 = 16.0;
const ANCHOR_GAP: f64 = 15.0;
const ANCHOR_MIN_TOP: f64 = 20.0;
const ANCHORED_WIDTH: f64 = 320.0;
const ANCHORED_HEIGHT_SINGLE: f64 = 100.0;
const ANCHORED_HEIGHT_MULTI: f64 = 180.0;
const MOBILE_BREAKPOINT: f64 = 768.0;
const ANCHORED_COMMENT_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

/// Popup offset from the viewport's top and right edges
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PopupPosition {
    pub top: f64,
    pub right: f64,
}

pub trait PositionStrategy {
    fn max_items(&self) -> usize;

    fn place(&self, item_count: usize, trigger: Option<Rect>, viewport: Viewport) -> PopupPosition;

    fn comment_text(&self, text: &str) -> String {
        text.to_string()
    }
}

/// Pinned below the top bar in the right corner
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedCorner;

impl PositionStrategy for FixedCorner {
    fn max_items(&self) -> usize {
        3
    }

    fn place(&self, _item_count: usize, _trigger: Option<Rect>, _viewport: Viewport) -> PopupPosition {
        PopupPosition {
            top: FIXED_TOP,
            right: EDGE_MARGIN,
        }
    }
}

/// Floats next to the button that opens the notifications list
#[derive(Debug, Clone, Copy, Default)]
pub struct AnchoredToTrigger;

impl PositionStrategy for AnchoredToTrigger {
    fn max_items(&self) -> usize {
        2
    }

    fn place(&self, item_count: usize, trigger: Option<Rect>, viewport: Viewport) -> PopupPosition {
        let Some(trigger) = trigger else {
            return FixedCorner.place(item_count, None, viewport);
        };

        let height = if item_count > 1 {
            ANCHORED_HEIGHT_MULTI
        } else {
            ANCHORED_HEIGHT_SINGLE
        };

        // Above the trigger, or below it when there is no room
        let mut top = trigger.top - height - ANCHOR_GAP;
        if top < ANCHOR_MIN_TOP {
            top = trigger.bottom() + ANCHOR_GAP;
        }

        let mut right = viewport.width - trigger.right();
        if viewport.width < MOBILE_BREAKPOINT {
            // Centered on the trigger; pinned to the right margin when it spills either edge
            let left = trigger.left + trigger.width / 2.0 - ANCHORED_WIDTH / 2.0;
            let spills =
                left < EDGE_MARGIN || left + ANCHORED_WIDTH > viewport.width - EDGE_MARGIN;
            right = if spills {
                EDGE_MARGIN
            } else {
                viewport.width - left - ANCHORED_WIDTH
            };
        }

        PopupPosition { top, right }
    }

    fn comment_text(&self, text: &str) -> String {
        if text.chars().count() > ANCHORED_COMMENT_CHARS {
            let cut: String = text.chars().take(ANCHORED_COMMENT_CHARS).collect();
            format!("{}...", cut)
        } else {
            text.to_string()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupIcon {
    UserPlus,
    Heart,
    Comment,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accent {
    Blue,
    Red,
    Green,
    Gray,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Profile(String),
    Home,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupItem {
    pub id: String,
    pub icon: PopupIcon,
    pub accent: Accent,
    pub sender_name: String,
    pub action: Option<&'static str>,
    pub comment: Option<String>,
    pub avatar_url: Option<String>,
    pub initials: String,
    pub thumbnail_url: Option<String>,
    pub time_ago: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupFrame {
    pub position: PopupPosition,
    pub items: Vec<PopupItem>,
    /// Notifications not shown because the popup is full
    pub overflow: usize,
}

/// Where the popup is being shown
#[derive(Debug, Clone)]
pub struct PopupEnv<'a> {
    pub route_path: &'a str,
    pub signed_in: bool,
    pub trigger: Option<Rect>,
    pub viewport: Viewport,
    pub now: DateTime<Utc>,
}

pub fn icon_for(kind: &NotificationKind) -> PopupIcon {
    match kind {
        NotificationKind::Follow => PopupIcon::UserPlus,
        NotificationKind::Comment => PopupIcon::Comment,
        NotificationKind::Like | NotificationKind::CommentLike | NotificationKind::Other(_) => {
            PopupIcon::Heart
        }
    }
}

pub fn accent_for(kind: &NotificationKind) -> Accent {
    match kind {
        NotificationKind::Follow => Accent::Blue,
        NotificationKind::Like => Accent::Red,
        NotificationKind::Comment | NotificationKind::CommentLike => Accent::Green,
        NotificationKind::Other(_) => Accent::Gray,
    }
}

pub fn action_phrase(kind: &NotificationKind) -> Option<&'static str> {
    match kind {
        NotificationKind::Follow => Some("started following you"),
        NotificationKind::Like => Some("liked your post"),
        NotificationKind::Comment => Some("commented on your post"),
        NotificationKind::CommentLike => Some("liked your comment"),
        NotificationKind::Other(_) => None,
    }
}

/// First letter of the sender's name, upper-cased; `U` when there is none
pub fn initials(name: &str) -> String {
    name.trim()
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_else(|| "U".to_string())
}

/// Where clicking a notification leads
pub fn click_route(notification: &Notification) -> Option<Route> {
    if notification.kind == NotificationKind::Follow {
        Some(Route::Profile(notification.sender.id.clone()))
    } else if notification.post.is_some() {
        Some(Route::Home)
    } else {
        None
    }
}

pub fn is_suppressed(route_path: &str, signed_in: bool) -> bool {
    !signed_in || SUPPRESSED_ROUTES.contains(&route_path)
}

pub struct PopupPresenter<S> {
    strategy: S,
}

impl<S: PositionStrategy> PopupPresenter<S> {
    pub fn new(strategy: S) -> Self {
        Self { strategy }
    }

    fn item(&self, notification: &Notification, now: DateTime<Utc>) -> PopupItem {
        let sender_name = if notification.sender.name.trim().is_empty() {
            "Someone".to_string()
        } else {
            notification.sender.name.clone()
        };
        let comment = match notification.kind {
            NotificationKind::Comment => notification
                .comment_text
                .as_deref()
                .filter(|text| !text.is_empty())
                .map(|text| self.strategy.comment_text(text)),
            _ => None,
        };
        let thumbnail_url = notification
            .post
            .as_ref()
            .and_then(|post| post.image_url.clone().or_else(|| post.video_url.clone()));

        PopupItem {
            id: notification.id.clone(),
            icon: icon_for(&notification.kind),
            accent: accent_for(&notification.kind),
            initials: initials(&notification.sender.name),
            sender_name,
            action: action_phrase(&notification.kind),
            comment,
            avatar_url: notification.sender.profile_image.clone(),
            thumbnail_url,
            time_ago: time_ago_compact(&notification.created_at, now),
        }
    }

    /// Lay out `notifications` (oldest first, as the store keeps them), newest on top
    pub fn present(&self, notifications: &[Notification], env: &PopupEnv<'_>) -> Option<PopupFrame> {
        if notifications.is_empty() || is_suppressed(env.route_path, env.signed_in) {
            return None;
        }

        let max = self.strategy.max_items();
        let items: Vec<PopupItem> = notifications
            .iter()
            .rev()
            .take(max)
            .map(|n| self.item(n, env.now))
            .collect();

        Some(PopupFrame {
            position: self.strategy.place(items.len(), env.trigger, env.viewport),
            overflow: notifications.len().saturating_sub(max),
            items,
        })
    }

    /// Dismiss the clicked item and return where to navigate
    pub fn click(&self, notification: &Notification, handle: &NotificationHandle) -> Option<Route> {
        handle.remove_notification(&notification.id);
        click_route(notification)
    }

    /// Close one item, or all of them when `id` is `None`
    pub fn close(&self, id: Option<&str>, handle: &NotificationHandle) {
        match id {
            Some(id) => handle.remove_notification(id),
            None => handle.clear_all_notifications(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::notification;
    use crate::sync::tests::FakeApi;
    use crate::sync::{NotificationSync, SyncSettings};
    use orbit_server::models::PostPreview;
    use std::sync::Arc;

    fn env(path: &str) -> PopupEnv<'_> {
        PopupEnv {
            route_path: path,
            signed_in: true,
            trigger: None,
            viewport: Viewport {
                width: 1280.0,
                height: 800.0,
            },
            now: Utc::now(),
        }
    }

    fn batch(n: usize) -> Vec<Notification> {
        (0..n)
            .map(|i| notification(&i.to_string(), "like", false))
            .collect()
    }

    #[test]
    fn test_fixed_corner_caps_at_three_with_overflow() {
        let presenter = PopupPresenter::new(FixedCorner);
        let frame = presenter.present(&batch(5), &env("/")).unwrap();

        assert_eq!(frame.items.len(), 3);
        assert_eq!(frame.overflow, 2);
        assert_eq!(frame.items[0].id, "4");
        assert_eq!(frame.position, PopupPosition { top: 80.0, right: 16.0 });

        let frame = presenter.present(&batch(3), &env("/")).unwrap();
        assert_eq!(frame.overflow, 0);
    }

    #[test]
    fn test_anchored_caps_at_two() {
        let presenter = PopupPresenter::new(AnchoredToTrigger);
        let frame = presenter.present(&batch(4), &env("/")).unwrap();
        assert_eq!(frame.items.len(), 2);
        assert_eq!(frame.overflow, 2);
    }

    #[test]
    fn test_nothing_to_show() {
        let presenter = PopupPresenter::new(FixedCorner);
        assert!(presenter.present(&[], &env("/")).is_none());
        assert!(presenter.present(&batch(1), &env("/chat")).is_none());
        assert!(presenter.present(&batch(1), &env("/notifications")).is_none());

        let signed_out = PopupEnv {
            signed_in: false,
            ..env("/")
        };
        assert!(presenter.present(&batch(1), &signed_out).is_none());
    }

    #[test]
    fn test_anchored_sits_above_trigger_and_flips_below() {
        let viewport = Viewport {
            width: 1280.0,
            height: 800.0,
        };
        let low = Rect {
            left: 1000.0,
            top: 700.0,
            width: 40.0,
            height: 40.0,
        };
        let pos = AnchoredToTrigger.place(1, Some(low), viewport);
        assert_eq!(pos.top, 700.0 - 100.0 - 15.0);
        assert_eq!(pos.right, 1280.0 - 1040.0);

        let pos = AnchoredToTrigger.place(2, Some(low), viewport);
        assert_eq!(pos.top, 700.0 - 180.0 - 15.0);

        let high = Rect { top: 60.0, ..low };
        let pos = AnchoredToTrigger.place(1, Some(high), viewport);
        assert_eq!(pos.top, 100.0 + 15.0);
    }

    #[test]
    fn test_anchored_centers_or_pins_right_on_narrow_viewports() {
        let viewport = Viewport {
            width: 400.0,
            height: 800.0,
        };
        let middle = Rect {
            left: 180.0,
            top: 700.0,
            width: 40.0,
            height: 40.0,
        };
        // Popup centered on x = 200 spans 40..360
        assert_eq!(AnchoredToTrigger.place(1, Some(middle), viewport).right, 40.0);

        let near_right = Rect { left: 350.0, ..middle };
        assert_eq!(AnchoredToTrigger.place(1, Some(near_right), viewport).right, 16.0);

        // Spilling off the left edge also pins to the right margin
        let near_left = Rect { left: 0.0, ..middle };
        assert_eq!(AnchoredToTrigger.place(1, Some(near_left), viewport).right, 16.0);

        // Too narrow for the popup at all
        let tiny = Viewport {
            width: 300.0,
            height: 800.0,
        };
        let centered = Rect { left: 130.0, ..middle };
        assert_eq!(AnchoredToTrigger.place(1, Some(centered), tiny).right, 16.0);
    }

    #[test]
    fn test_item_details() {
        let mut comment = notification("c", "comment", false);
        comment.comment_text =
            Some("This is a rather long comment that keeps going".to_string());
        comment.sender.name = "zoe".to_string();

        let fixed = PopupPresenter::new(FixedCorner)
            .present(&[comment.clone()], &env("/"))
            .unwrap();
        let item = &fixed.items[0];
        assert_eq!(item.icon, PopupIcon::Comment);
        assert_eq!(item.accent, Accent::Green);
        assert_eq!(item.action, Some("commented on your post"));
        assert_eq!(item.initials, "Z");
        assert_eq!(item.time_ago, "now");
        assert_eq!(
            item.comment.as_deref(),
            Some("This is a rather long comment that keeps going")
        );

        let anchored = PopupPresenter::new(AnchoredToTrigger)
            .present(&[comment], &env("/"))
            .unwrap();
        assert_eq!(
            anchored.items[0].comment.as_deref(),
            Some("This is a rather long comment ...")
        );
    }

    #[test]
    fn test_accents_icons_and_fallbacks() {
        assert_eq!(accent_for(&NotificationKind::Follow), Accent::Blue);
        assert_eq!(accent_for(&NotificationKind::Like), Accent::Red);
        assert_eq!(accent_for(&NotificationKind::CommentLike), Accent::Green);
        assert_eq!(accent_for(&NotificationKind::from("mention")), Accent::Gray);
        assert_eq!(icon_for(&NotificationKind::Follow), PopupIcon::UserPlus);
        assert_eq!(icon_for(&NotificationKind::CommentLike), PopupIcon::Heart);
        assert_eq!(action_phrase(&NotificationKind::from("mention")), None);
        assert_eq!(initials(""), "U");
        assert_eq!(initials("élise"), "É");
    }

    #[test]
    fn test_click_routes_and_dismisses() {
        let sync = Arc::new(NotificationSync::new(
            Arc::new(FakeApi::default()),
            "me",
            SyncSettings::default(),
        ));
        let handle = NotificationHandle::Attached(sync);
        let presenter = PopupPresenter::new(FixedCorner);

        let follow = notification("f", "follow", false);
        let mut like = notification("l", "like", false);
        like.post = Some(PostPreview {
            image_url: Some("https://cdn.example/p.jpg".to_string()),
            ..PostPreview::default()
        });
        let bare = notification("b", "comment", false);
        for n in [&follow, &like, &bare] {
            handle.add_new_notification((*n).clone());
        }

        assert_eq!(
            presenter.click(&follow, &handle),
            Some(Route::Profile("s1".to_string()))
        );
        assert_eq!(presenter.click(&like, &handle), Some(Route::Home));
        assert_eq!(handle.new_notifications().len(), 1);
        assert_eq!(presenter.click(&bare, &handle), None);
        assert!(handle.new_notifications().is_empty());
    }

    #[test]
    fn test_close_one_or_all() {
        let sync = Arc::new(NotificationSync::new(
            Arc::new(FakeApi::default()),
            "me",
            SyncSettings::default(),
        ));
        let handle = NotificationHandle::Attached(sync);
        let presenter = PopupPresenter::new(AnchoredToTrigger);
        for n in batch(3) {
            handle.add_new_notification(n);
        }

        presenter.close(Some("1"), &handle);
        assert_eq!(handle.new_notifications().len(), 2);

        presenter.close(None, &handle);
        assert!(handle.new_notifications().is_empty());
    }
}
