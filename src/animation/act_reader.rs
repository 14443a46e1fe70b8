//! Act 文本读取
//!
//! 逐行格式：
//! - `o <名称>` 开始对象
//! - `a <名称>` 在当前对象中开始动作
//! - `c <名称>` 在当前动作中开始通道
//! - `k <帧> <值>` 向当前通道添加关键帧
//!
//! 空行与未知标识忽略，行尾 `\` 续行，标识不区分大小写。

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use super::act::{Act, ActAction, ActChannel};
use crate::{EngineError, Result};

/// 从文件读取
pub fn load_act<P: AsRef<Path>>(path: P) -> Result<Act> {
    let file = std::fs::File::open(path.as_ref())?;
    read_act(file)
}

/// 从字符串解析
pub fn parse_act(text: &str) -> Result<Act> {
    read_act(text.as_bytes())
}

/// 从 Reader 读取
pub fn read_act<R: Read>(reader: R) -> Result<Act> {
    let mut act = Act::new();
    read_act_into(BufReader::new(reader), &mut act)?;
    Ok(act)
}

/// 读取到已有的 Act 中（同名对象合并，重名动作报错）
pub fn read_act_into<R: BufRead>(reader: R, act: &mut Act) -> Result<()> {
    let mut parser = ActParser::new(act);
    let mut lines = reader.lines();
    let mut line_num = 0;

    while let Some(line) = lines.next() {
        line_num += 1;
        let start_line = line_num;
        let mut line = line?.trim().to_string();

        // 合并续行
        while line.ends_with('\\') {
            line.pop();
            match lines.next() {
                Some(next) => {
                    line_num += 1;
                    line.push(' ');
                    line.push_str(next?.trim());
                }
                None => break,
            }
        }

        parser.parse_line(&line).map_err(|message| EngineError::ActParse { line: start_line, message })?;
    }
    Ok(())
}

struct ActParser<'a> {
    act: &'a mut Act,
    object: Option<usize>,
    action: Option<usize>,
    channel: Option<usize>,
}

impl<'a> ActParser<'a> {
    fn new(act: &'a mut Act) -> Self {
        Self { act, object: None, action: None, channel: None }
    }

    fn parse_line(&mut self, line: &str) -> std::result::Result<(), String> {
        let mut tokens = line.split_whitespace();
        let Some(identifier) = tokens.next() else {
            return Ok(());
        };
        let rest = line[identifier.len()..].trim();

        match identifier.to_ascii_lowercase().as_str() {
            "o" => {
                let name = non_empty(rest, "object")?;
                self.object = Some(self.act.object_index(name));
                self.action = None;
                self.channel = None;
            }
            "a" => {
                let name = non_empty(rest, "action")?;
                let object = self
                    .object
                    .and_then(|i| self.act.object_at_mut(i))
                    .ok_or("cannot create an action without an object")?;
                object.add_action(ActAction::new(name)).map_err(|e| e.to_string())?;
                self.action = Some(object.actions().len() - 1);
                self.channel = None;
            }
            "c" => {
                let name = non_empty(rest, "channel")?;
                let action = self.current_action().ok_or("cannot create a channel without an action")?;
                action.add_channel(ActChannel::new(name)).map_err(|e| e.to_string())?;
                let index = action.channels().len() - 1;
                self.channel = Some(index);
            }
            "k" => {
                let frame = parse_float(tokens.next(), "frame")?;
                let value = parse_float(tokens.next(), "value")?;
                let channel_index = self.channel;
                let channel = self
                    .current_action()
                    .and_then(|a| channel_index.and_then(|i| a.channel_at_mut(i)))
                    .ok_or("cannot add a sample without a channel")?;
                channel.add_sample(frame, value);
            }
            _ => {}
        }
        Ok(())
    }

    fn current_action(&mut self) -> Option<&mut ActAction> {
        let action = self.action?;
        self.act.object_at_mut(self.object?)?.action_at_mut(action)
    }
}

fn non_empty<'s>(name: &'s str, kind: &str) -> std::result::Result<&'s str, String> {
    if name.is_empty() {
        Err(format!("missing {} name", kind))
    } else {
        Ok(name)
    }
}

fn parse_float(token: Option<&str>, what: &str) -> std::result::Result<f64, String> {
    let token = token.ok_or_else(|| format!("missing sample {}", what))?;
    let value = token.parse::<f64>().map_err(|e| format!("invalid sample {} '{}': {}", what, token, e))?;
    if !value.is_finite() {
        return Err(format!("sample {} '{}' is not finite", what, token));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALK: &str = "\
o arm
a walk
c rot.w
k 0 1
k 10 0.5
c pos.x
k 0 0.0

O leg
A walk
C pos.y
K 5 \\
  2.5
";

    #[test]
    fn test_parse_structure() {
        let act = parse_act(WALK).unwrap();
        assert_eq!(act.object_count(), 2);

        let walk = act.object("arm").unwrap().action("walk").unwrap();
        assert_eq!(walk.channels().len(), 2);
        assert_eq!(walk.channel("rot.w").unwrap().value(5.0).unwrap(), 0.75);

        let leg = act.object("leg").unwrap().action("walk").unwrap();
        assert_eq!(leg.channel("pos.y").unwrap().samples(), &[(5.0, 2.5)]);
    }

    #[test]
    fn test_structural_errors_report_line() {
        let err = parse_act("\n\na walk\n").unwrap_err();
        assert!(matches!(err, EngineError::ActParse { line: 3, .. }));

        let err = parse_act("o arm\nc pos.x\n").unwrap_err();
        assert!(matches!(err, EngineError::ActParse { line: 2, .. }));

        let err = parse_act("o arm\na walk\nk 0 1\n").unwrap_err();
        assert!(matches!(err, EngineError::ActParse { line: 3, .. }));
    }

    #[test]
    fn test_bad_float() {
        let err = parse_act("o arm\na walk\nc pos.x\nk zero 1\n").unwrap_err();
        assert!(matches!(err, EngineError::ActParse { line: 4, .. }));
    }

    #[test]
    fn test_non_finite_rejected() {
        for line in ["k NaN 5", "k inf 1", "k 2 -inf"] {
            let text = format!("o arm\na walk\nc pos.x\n{}\n", line);
            let err = parse_act(&text).unwrap_err();
            assert!(matches!(err, EngineError::ActParse { line: 4, .. }), "{}", line);
        }
    }

    #[test]
    fn test_load_act_from_file() {
        let path = std::env::temp_dir().join(format!("skeletal_engine_act_{}.act", std::process::id()));
        std::fs::write(&path, WALK).unwrap();
        let loaded = load_act(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.unwrap(), parse_act(WALK).unwrap());

        let missing = load_act(std::env::temp_dir().join("skeletal_engine_missing.act"));
        assert!(matches!(missing, Err(EngineError::Io(_))));
    }

    #[test]
    fn test_duplicate_action() {
        let err = parse_act("o arm\na walk\no arm\na walk\n").unwrap_err();
        assert!(matches!(err, EngineError::ActParse { line: 4, .. }));
    }

    #[test]
    fn test_unknown_lines_ignored() {
        let act = parse_act("# comment\nvt 1 2\no arm\n").unwrap();
        assert_eq!(act.object_count(), 1);
    }
}
