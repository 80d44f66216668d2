//! Interactive settings menu (dialoguer)
//!
//! Every change is saved as soon as it is made.

use colored::Colorize;
use dialoguer::{Select, theme::ColorfulTheme};

use crate::core::url_cache::ResolutionCache;
use crate::error::Result;
use crate::storage::{cache, config};
use crate::types::{MenuItem, ResolverName, Settings, TargetPlatform};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupAction {
    /// `true` for redirect mode, `false` for button mode
    SetRedirect(bool),
    ToggleRedirectPlaylist,
    ToggleRedirectChannel,
    ToggleVideoSubButton,
    ToggleVideoPlayerButton,
    ToggleChannelSubButton,
    ChooseTargetPlatform,
    ChooseResolver,
    ClearCache,
    Done,
}

fn active(on: bool) -> &'static str {
    if on { "Active" } else { "Deactive" }
}

/// Menu for the current settings; button toggles only show in button mode
pub fn menu_items(settings: &Settings) -> Vec<MenuItem<PopupAction>> {
    let redirect = settings.redirects();
    let mut items = vec![MenuItem {
        label: format!(
            "Mode: {}",
            if redirect { "Redirect" } else { "Show a button" }
        ),
        value: PopupAction::SetRedirect(!redirect),
    }];

    if redirect {
        items.push(MenuItem {
            label: format!("Redirect playlist videos: {}", active(settings.redirect_video_playlist)),
            value: PopupAction::ToggleRedirectPlaylist,
        });
        items.push(MenuItem {
            label: format!("Redirect channels: {}", active(settings.redirect_channel)),
            value: PopupAction::ToggleRedirectChannel,
        });
    } else {
        items.push(MenuItem {
            label: format!("Video / Subscribe Button: {}", active(settings.button_video_sub)),
            value: PopupAction::ToggleVideoSubButton,
        });
        items.push(MenuItem {
            label: format!("Video / Video Player: {}", active(settings.button_video_player)),
            value: PopupAction::ToggleVideoPlayerButton,
        });
        items.push(MenuItem {
            label: format!("Channel / Subscribe Button: {}", active(settings.button_channel_sub)),
            value: PopupAction::ToggleChannelSubButton,
        });
    }

    items.extend([
        MenuItem {
            label: format!(
                "Open on: {}",
                settings.target_platform.settings().display_name
            ),
            value: PopupAction::ChooseTargetPlatform,
        },
        MenuItem {
            label: format!("Resolver: {}", settings.url_resolver.display_name()),
            value: PopupAction::ChooseResolver,
        },
        MenuItem {
            label: "Clear Resolver Cache".into(),
            value: PopupAction::ClearCache,
        },
        MenuItem {
            label: "Done".into(),
            value: PopupAction::Done,
        },
    ]);
    items
}

/// Apply a toggle; actions needing more input leave settings untouched
pub fn apply(settings: &Settings, action: PopupAction) -> Settings {
    let mut next = settings.clone();
    match action {
        PopupAction::SetRedirect(true) => next.redirect_video = true,
        PopupAction::SetRedirect(false) => {
            next.redirect_video = false;
            next.redirect_video_playlist = false;
            next.redirect_channel = false;
        }
        PopupAction::ToggleRedirectPlaylist => {
            next.redirect_video_playlist = !next.redirect_video_playlist
        }
        PopupAction::ToggleRedirectChannel => next.redirect_channel = !next.redirect_channel,
        PopupAction::ToggleVideoSubButton => next.button_video_sub = !next.button_video_sub,
        PopupAction::ToggleVideoPlayerButton => {
            next.button_video_player = !next.button_video_player
        }
        PopupAction::ToggleChannelSubButton => next.button_channel_sub = !next.button_channel_sub,
        PopupAction::ChooseTargetPlatform
        | PopupAction::ChooseResolver
        | PopupAction::ClearCache
        | PopupAction::Done => {}
    }
    next
}

fn select<T: Clone>(items: &[MenuItem<T>], prompt: &str, default: usize) -> Option<T> {
    if items.is_empty() {
        return None;
    }

    let labels: Vec<&str> = items.iter().map(|i| i.label.as_str()).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(&labels)
        .default(default.min(items.len() - 1))
        .interact_opt()
        .ok()
        .flatten()?;

    items.get(selection).map(|item| item.value.clone())
}

fn choose_target_platform(current: TargetPlatform) -> Option<TargetPlatform> {
    let items: Vec<MenuItem<TargetPlatform>> = TargetPlatform::ALL
        .into_iter()
        .map(|p| MenuItem {
            label: p.settings().display_name.to_string(),
            value: p,
        })
        .collect();
    let default = items.iter().position(|i| i.value == current).unwrap_or(0);
    select(&items, "Open on", default)
}

fn choose_resolver(current: ResolverName) -> Option<ResolverName> {
    let items: Vec<MenuItem<ResolverName>> = ResolverName::ALL
        .into_iter()
        .map(|r| MenuItem {
            label: r.display_name().to_string(),
            value: r,
        })
        .collect();
    let default = items.iter().position(|i| i.value == current).unwrap_or(0);
    select(&items, "Resolver", default)
}

/// Run the menu until the user is done, returns the final settings
pub async fn run(mut settings: Settings, resolver_cache: &ResolutionCache) -> Result<Settings> {
    println!("{}", "Watch on LBRY".bold());

    let mut cursor = 0;
    loop {
        let items = menu_items(&settings);
        let Some(action) = select(&items, "Settings", cursor) else {
            break;
        };
        cursor = items.iter().position(|i| i.value == action).unwrap_or(0);

        let next = match action {
            PopupAction::Done => break,
            PopupAction::ClearCache => {
                match cache::clear_all(resolver_cache).await {
                    Ok(()) => println!("{}", "Cleared Cache!".green()),
                    Err(e) => eprintln!("{} {}", "Error:".red(), e),
                }
                continue;
            }
            PopupAction::ChooseTargetPlatform => match choose_target_platform(settings.target_platform) {
                Some(platform) => Settings {
                    target_platform: platform,
                    ..settings.clone()
                },
                None => continue,
            },
            PopupAction::ChooseResolver => match choose_resolver(settings.url_resolver) {
                Some(resolver) => Settings {
                    url_resolver: resolver,
                    ..settings.clone()
                },
                None => continue,
            },
            toggle => apply(&settings, toggle),
        };

        if next != settings {
            config::save_settings(&next).await?;
            settings = next;
        }
    }

    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_mode_clears_every_redirect() {
        let settings = Settings {
            redirect_video_playlist: true,
            redirect_channel: true,
            ..Settings::default()
        };
        let buttons = apply(&settings, PopupAction::SetRedirect(false));
        assert!(!buttons.redirects());

        let redirect = apply(&buttons, PopupAction::SetRedirect(true));
        assert!(redirect.redirect_video);
        assert!(!redirect.redirect_channel);
    }

    #[test]
    fn test_menu_depends_on_mode() {
        let redirect = Settings::default();
        let items = menu_items(&redirect);
        assert_eq!(items[0].value, PopupAction::SetRedirect(false));
        assert!(items.iter().all(|i| i.value != PopupAction::ToggleVideoSubButton));

        let buttons = apply(&redirect, PopupAction::SetRedirect(false));
        let items = menu_items(&buttons);
        assert_eq!(items[0].label, "Mode: Show a button");
        assert!(items.iter().any(|i| i.value == PopupAction::ToggleVideoPlayerButton));
        assert_eq!(items.last().unwrap().value, PopupAction::Done);
    }

    #[test]
    fn test_toggles_flip_one_flag() {
        let settings = Settings::default();
        let next = apply(&settings, PopupAction::ToggleChannelSubButton);
        assert!(!next.button_channel_sub);
        assert_eq!(
            Settings {
                button_channel_sub: true,
                ..next
            },
            settings
        );
    }
}
